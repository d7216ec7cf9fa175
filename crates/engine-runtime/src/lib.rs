pub mod cache;
pub mod error;
pub mod executor;
pub mod session;
pub mod store;

pub use cache::{CompiledPlan, PlanCache};
pub use error::{ExecutionError, Result};
pub use executor::{Executor, QueryOutput, Snapshot, load_snapshot};
pub use session::{PreparedQuery, QuerySession};
pub use store::{InMemoryStore, QueryStore};
