pub mod binary;
pub mod constant;
pub mod predicate;

use crate::{
    context::EvalContext,
    error::{ExpressionError, Result},
};
use binary::BinaryOpEvaluator;
use model::{
    core::value::Value,
    query::{BinaryOp, Constant, Expr, UnaryOp},
};

/// Trait for evaluating expression trees to a single value
pub trait Evaluator {
    fn evaluate(&self, ctx: &EvalContext) -> Result<Value>;
}

impl Evaluator for Expr {
    fn evaluate(&self, ctx: &EvalContext) -> Result<Value> {
        match self {
            Expr::Constant(Constant::Value(value)) => Ok(value.clone()),
            Expr::Constant(Constant::Captured(captured)) => Ok(captured.evaluate()),

            Expr::Variable(variable) => ctx
                .lookup(variable)
                .cloned()
                .ok_or_else(|| ExpressionError::UnboundVariable(variable.name.to_string())),

            Expr::Parameter(name) => ctx
                .get_parameter(name)
                .cloned()
                .ok_or_else(|| ExpressionError::UnknownParameter(name.clone())),

            Expr::Member { target, member } => {
                let target = target.evaluate(ctx)?;
                match &target {
                    // Member access through a missing row yields null
                    Value::Null => Ok(Value::Null),
                    Value::Record(_) => target
                        .field(member)
                        .cloned()
                        .ok_or_else(|| ExpressionError::FieldNotFound(member.clone())),
                    other => Err(ExpressionError::TypeMismatch {
                        expected: "record".to_string(),
                        actual: other.type_name().to_string(),
                    }),
                }
            }

            Expr::Unary { op, operand } => eval_unary(*op, operand.evaluate(ctx)?),

            Expr::Binary {
                left,
                op: op @ (BinaryOp::And | BinaryOp::Or),
                right,
            } => {
                let short_circuit = matches!(op, BinaryOp::Or);
                if truthy(&left.evaluate(ctx)?)? == short_circuit {
                    return Ok(Value::Boolean(short_circuit));
                }
                Ok(Value::Boolean(truthy(&right.evaluate(ctx)?)?))
            }

            Expr::Binary { left, op, right } => {
                let left = left.evaluate(ctx)?;
                let right = right.evaluate(ctx)?;
                BinaryOpEvaluator::new(&left, &right, op)
                    .evaluate()
                    .ok_or_else(|| {
                        ExpressionError::UnsupportedOperation(format!(
                            "{} {} {}",
                            left.type_name(),
                            op.symbol(),
                            right.type_name()
                        ))
                    })
            }

            Expr::Call(_) | Expr::QueryRoot(_) => match ctx.subqueries() {
                Some(executor) => executor.evaluate_subquery(self, ctx),
                None => Err(ExpressionError::UnsupportedOperation(format!(
                    "nested query outside of row evaluation: {self}"
                ))),
            },

            Expr::Lambda(_) | Expr::Quote(_) => Err(ExpressionError::UnsupportedOperation(
                format!("lambda used as a value: {self}"),
            )),
        }
    }
}

fn eval_unary(op: UnaryOp, operand: Value) -> Result<Value> {
    match (op, operand) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOp::Negate, Value::Int(i)) => Ok(Value::Int(-i)),
        (UnaryOp::Negate, Value::Float(f)) => Ok(Value::Float(-f)),
        (op, other) => Err(ExpressionError::UnsupportedOperation(format!(
            "{op:?} on {}",
            other.type_name()
        ))),
    }
}

/// Null counts as false, as in SQL filtering.
pub(crate) fn truthy(value: &Value) -> Result<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Null => Ok(false),
        other => Err(ExpressionError::TypeMismatch {
            expected: "boolean".to_string(),
            actual: other.type_name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Bindings;
    use model::{
        core::identifiers::EntityType,
        query::{ParameterValues, Variable},
    };

    #[test]
    fn test_and_short_circuits() {
        // The right side would fail on an unknown parameter
        let expr = Expr::and(Expr::value(false), Expr::parameter("missing"));
        assert_eq!(
            expr.evaluate(&EvalContext::Constant).unwrap(),
            Value::Boolean(false)
        );

        let expr = Expr::and(Expr::value(true), Expr::parameter("missing"));
        assert!(matches!(
            expr.evaluate(&EvalContext::Constant),
            Err(ExpressionError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_row_member_and_parameter() {
        let u = Variable::new("u", EntityType::from("User"));
        let row = Value::record([("tenant_id", Value::Int(7))]);
        let bindings = Bindings::new().with(u.clone(), row);
        let mut params = ParameterValues::new();
        params.add("p0", Value::Int(7)).unwrap();

        let ctx = EvalContext::row(&params, &bindings, None);
        let expr = Expr::eq(u.field("tenant_id"), Expr::parameter("p0"));
        assert_eq!(expr.evaluate(&ctx).unwrap(), Value::Boolean(true));

        let missing = u.field("deleted");
        assert!(matches!(
            missing.evaluate(&ctx),
            Err(ExpressionError::FieldNotFound(ref f)) if f == "deleted"
        ));
    }

    #[test]
    fn test_not_over_null_is_null() {
        let expr = Expr::not(Expr::value(Value::Null));
        assert_eq!(expr.evaluate(&EvalContext::Constant).unwrap(), Value::Null);
    }
}
