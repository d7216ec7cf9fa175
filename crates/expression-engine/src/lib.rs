pub mod context;
pub mod error;
pub mod eval;

pub use context::{Bindings, EvalContext, SubqueryExecutor};
pub use error::{ExpressionError, Result};
pub use eval::{
    constant::{evaluate_captured, is_captured_chain},
    predicate::test_predicate,
    Evaluator,
};
