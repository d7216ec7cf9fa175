use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("Variable '{0}' is not bound in this scope")]
    UnboundVariable(String),

    #[error("Parameter '{0}' has no value")]
    UnknownParameter(String),

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Subquery failed: {0}")]
    Subquery(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, ExpressionError>;
