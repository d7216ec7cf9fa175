use super::{truthy, Evaluator};
use crate::{
    context::{Bindings, EvalContext, SubqueryExecutor},
    error::{ExpressionError, Result},
};
use model::{
    core::value::Value,
    query::{Expr, ParameterValues},
};

/// Apply a single-parameter predicate (quoted or bare lambda) to one row.
///
/// `outer` carries the variables of enclosing queries so correlated
/// subqueries can refer to them.
pub fn test_predicate(
    predicate: &Expr,
    row: Value,
    parameters: &ParameterValues,
    outer: &Bindings,
    subqueries: Option<&dyn SubqueryExecutor>,
) -> Result<bool> {
    let unquoted = match predicate {
        Expr::Quote(inner) => inner.as_ref(),
        other => other,
    };
    let Expr::Lambda(lambda) = unquoted else {
        return Err(ExpressionError::UnsupportedOperation(format!(
            "expected a predicate lambda, got {predicate}"
        )));
    };
    let variable = lambda.bound_variable().ok_or_else(|| {
        ExpressionError::UnsupportedOperation(format!(
            "predicate must take exactly one parameter: {predicate}"
        ))
    })?;

    let bindings = outer.with(variable.clone(), row);
    let ctx = EvalContext::row(parameters, &bindings, subqueries);
    truthy(&lambda.body.evaluate(&ctx)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{
        core::identifiers::EntityType,
        query::{Lambda, Variable},
    };

    #[test]
    fn test_quoted_predicate() {
        let u = Variable::new("u", EntityType::from("User"));
        let predicate = Expr::quote(
            Lambda::predicate(u.clone(), Expr::not(u.field("deleted"))).into_expr(),
        );
        let params = ParameterValues::new();

        let live = Value::record([("deleted", Value::Boolean(false))]);
        let gone = Value::record([("deleted", Value::Boolean(true))]);
        assert!(test_predicate(&predicate, live, &params, &Bindings::new(), None).unwrap());
        assert!(!test_predicate(&predicate, gone, &params, &Bindings::new(), None).unwrap());
    }

    #[test]
    fn test_non_boolean_body_is_rejected() {
        let u = Variable::new("u", EntityType::from("User"));
        let predicate = Lambda::predicate(u.clone(), u.field("name")).into_expr();
        let row = Value::record([("name", Value::from("ann"))]);

        let err = test_predicate(&predicate, row, &ParameterValues::new(), &Bindings::new(), None)
            .unwrap_err();
        assert!(matches!(err, ExpressionError::TypeMismatch { .. }));
    }
}
