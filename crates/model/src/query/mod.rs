pub mod builder;
pub mod expr;
pub mod method;
pub mod params;

pub use builder::Query;
pub use expr::{BinaryOp, Captured, Constant, Expr, ExprRef, Lambda, MethodCall, UnaryOp, Variable};
pub use method::Method;
pub use params::ParameterValues;
