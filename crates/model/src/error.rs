use crate::core::value::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Parameter '{name}' is already bound to {existing}")]
    DuplicateParameter { name: String, existing: Value },
}

pub type Result<T> = std::result::Result<T, ModelError>;
