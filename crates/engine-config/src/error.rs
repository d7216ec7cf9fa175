use engine_core::error::FilterError;
use model::core::identifiers::EntityType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid filter for {entity}: {source}")]
    InvalidFilter {
        entity: EntityType,
        #[source]
        source: FilterError,
    },

    #[error("Failed to parse dynamic filter settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read dynamic filter settings: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
