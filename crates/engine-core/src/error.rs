use model::core::identifiers::EntityType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Request context has no service of type {0}")]
    MissingService(&'static str),

    #[error("Filter predicate for {entity} must take exactly one parameter of that type: {predicate}")]
    InvalidPredicate { entity: EntityType, predicate: String },

    #[error("Filter factory for {entity} failed: {message}")]
    Factory { entity: EntityType, message: String },
}

pub type Result<T> = std::result::Result<T, FilterError>;
