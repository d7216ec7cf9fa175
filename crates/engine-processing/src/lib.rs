pub mod error;
pub mod rewrite;

pub use error::{Result, RewriteError};
pub use rewrite::FilterRewriter;
