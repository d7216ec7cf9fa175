use engine_core::error::FilterError;
use expression_engine::ExpressionError;
use model::error::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("Invalid ignore query filter expression \"{expression}\"")]
    InvalidIgnoreFilter { expression: String },

    #[error("Unsupported expression \"{expression}\"")]
    UnsupportedExpression { expression: String },

    #[error("Failed to evaluate captured value \"{expression}\": {source}")]
    CapturedValue {
        expression: String,
        #[source]
        source: ExpressionError,
    },

    #[error("Failed to resolve dynamic filters: {0}")]
    Filter(#[from] FilterError),

    #[error("Failed to bind parameter: {0}")]
    Parameter(#[from] ModelError),
}

impl RewriteError {
    pub(crate) fn unsupported(expression: &impl std::fmt::Display) -> Self {
        RewriteError::UnsupportedExpression {
            expression: expression.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RewriteError>;
