use engine_processing::RewriteError;
use expression_engine::ExpressionError;
use model::{core::identifiers::EntityType, error::ModelError};
use thiserror::Error;

/// Errors raised while running a query against a store.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Rewrite error: {0}")]
    Rewrite(#[from] RewriteError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] ExpressionError),

    #[error("Parameter error: {0}")]
    Parameter(#[from] ModelError),

    #[error("Unknown entity type: {0}")]
    UnknownEntity(EntityType),

    /// An ignore-filter marker that the rewriter should have consumed.
    #[error("Filter marker reached execution: {0}")]
    UnresolvedMarker(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Sequence contains no elements: {0}")]
    EmptySequence(String),
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
