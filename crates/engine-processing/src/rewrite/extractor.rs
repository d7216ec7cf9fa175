use super::rebuild_if_changed;
use crate::error::{Result, RewriteError};
use expression_engine::{evaluate_captured, is_captured_chain};
use model::query::{Expr, ExprRef, Lambda, ParameterValues};
use std::sync::Arc;
use tracing::trace;

pub const PARAMETER_PREFIX: &str = "__dynamic_filter_param__";

/// Name of the `n`th parameter synthesized in one rewrite pass.
pub fn parameter_name(n: usize) -> String {
    format!("{PARAMETER_PREFIX}{n}")
}

/// Replaces captured sub-expressions with named parameters.
///
/// Each captured chain is evaluated on the spot, its value bound in the
/// parameter table under the next synthetic name, and the chain replaced by
/// a `Parameter` node. The tree shape then no longer depends on captured
/// values, only on how many there were.
pub struct ParameterExtractor<'a> {
    params: &'a mut ParameterValues,
    counter: &'a mut usize,
}

impl<'a> ParameterExtractor<'a> {
    pub fn new(params: &'a mut ParameterValues, counter: &'a mut usize) -> Self {
        Self { params, counter }
    }

    pub fn extract(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        if is_captured_chain(expr) {
            return self.bind(expr);
        }

        Ok(match expr.as_ref() {
            Expr::Member { target, member } => {
                let new_target = self.extract(target)?;
                if Arc::ptr_eq(target, &new_target) {
                    expr.clone()
                } else {
                    Expr::member(new_target, member.clone())
                }
            }

            Expr::Unary { op, operand } => {
                let new_operand = self.extract(operand)?;
                if Arc::ptr_eq(operand, &new_operand) {
                    expr.clone()
                } else {
                    Expr::unary(*op, new_operand)
                }
            }

            Expr::Binary { left, op, right } => {
                let new_left = self.extract(left)?;
                let new_right = self.extract(right)?;
                if Arc::ptr_eq(left, &new_left) && Arc::ptr_eq(right, &new_right) {
                    expr.clone()
                } else {
                    Expr::binary(new_left, *op, new_right)
                }
            }

            Expr::Lambda(lambda) => {
                let new_body = self.extract(&lambda.body)?;
                if Arc::ptr_eq(&lambda.body, &new_body) {
                    expr.clone()
                } else {
                    Lambda::new(lambda.parameters.clone(), new_body).into_expr()
                }
            }

            Expr::Quote(inner) => {
                let new_inner = self.extract(inner)?;
                if Arc::ptr_eq(inner, &new_inner) {
                    expr.clone()
                } else {
                    Expr::quote(new_inner)
                }
            }

            Expr::Call(call) => {
                let args = call
                    .args
                    .iter()
                    .map(|arg| self.extract(arg))
                    .collect::<Result<Vec<_>>>()?;
                rebuild_if_changed(expr, call, args)
            }

            Expr::Constant(_) | Expr::Variable(_) | Expr::Parameter(_) | Expr::QueryRoot(_) => {
                expr.clone()
            }
        })
    }

    fn bind(&mut self, expr: &ExprRef) -> Result<ExprRef> {
        let value = evaluate_captured(expr).map_err(|source| RewriteError::CapturedValue {
            expression: expr.to_string(),
            source,
        })?;

        let name = parameter_name(*self.counter);
        trace!("Extracted {} into parameter {} = {}", expr, name, value);
        self.params.add(name.clone(), value)?;
        *self.counter += 1;

        Ok(Expr::parameter(name))
    }
}
