pub mod error;
pub mod options;
pub mod settings;

pub use error::{ConfigError, Result};
pub use options::{EntityFilterBuilder, FilterOptions, FilterSpec};
pub use settings::DynamicFilterSettings;
