pub mod core;
pub mod error;
pub mod query;
pub mod records;

pub use error::{ModelError, Result};
