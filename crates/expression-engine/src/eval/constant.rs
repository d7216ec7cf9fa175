use super::Evaluator;
use crate::{context::EvalContext, error::Result};
use model::{
    core::value::Value,
    query::{Constant, Expr},
};

/// True when `expr` is computed only from closed-over state: a captured
/// value, or a member chain whose root is a constant.
///
/// Literal constants on their own are part of the query's shape and do not
/// qualify.
pub fn is_captured_chain(expr: &Expr) -> bool {
    match expr {
        Expr::Constant(Constant::Captured(_)) => true,
        Expr::Member { target, .. } => is_constant_rooted(target),
        _ => false,
    }
}

fn is_constant_rooted(expr: &Expr) -> bool {
    match expr {
        Expr::Constant(_) => true,
        Expr::Member { target, .. } => is_constant_rooted(target),
        _ => false,
    }
}

/// Evaluate a captured chain now, outside of any row.
pub fn evaluate_captured(expr: &Expr) -> Result<Value> {
    expr.evaluate(&EvalContext::Constant)
}
