use lazy_static::lazy_static;
use model::query::{Expr, Method, MethodCall};
use std::collections::HashMap;

/// Argument layout of a query operator that takes the previous query and a
/// row predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorShape {
    pub arity: usize,
    pub source: usize,
    pub predicate: usize,
}

const SOURCE_AND_PREDICATE: OperatorShape = OperatorShape {
    arity: 2,
    source: 0,
    predicate: 1,
};

lazy_static! {
    static ref QUERY_OPERATORS: HashMap<Method, OperatorShape> = {
        let mut m = HashMap::new();
        m.insert(Method::Where, SOURCE_AND_PREDICATE);
        m.insert(Method::Any, SOURCE_AND_PREDICATE);
        m.insert(Method::First, SOURCE_AND_PREDICATE);
        m.insert(Method::FirstOrDefault, SOURCE_AND_PREDICATE);
        m.insert(Method::Last, SOURCE_AND_PREDICATE);
        m.insert(Method::LastOrDefault, SOURCE_AND_PREDICATE);
        m
    };
}

/// The shape of `call` if it is a filter-carrying query operator: a known
/// method with exactly a source and a single-parameter predicate.
pub fn recognize(call: &MethodCall) -> Option<OperatorShape> {
    let shape = QUERY_OPERATORS.get(&call.method)?;
    let matches = call.args.len() == shape.arity && is_predicate(&call.args[shape.predicate]);
    matches.then_some(*shape)
}

pub fn is_predicate(expr: &Expr) -> bool {
    match expr {
        Expr::Quote(inner) => is_predicate(inner),
        Expr::Lambda(lambda) => lambda.bound_variable().is_some(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{
        core::identifiers::EntityType,
        query::{Lambda, Variable},
    };

    fn user() -> EntityType {
        EntityType::from("User")
    }

    fn predicate() -> std::sync::Arc<Expr> {
        let u = Variable::new("u", user());
        Expr::quote(Lambda::predicate(u, Expr::value(true)).into_expr())
    }

    fn call(method: Method, args: Vec<std::sync::Arc<Expr>>) -> MethodCall {
        MethodCall {
            method,
            element: user(),
            args,
        }
    }

    #[test]
    fn test_recognizes_predicate_operators() {
        for method in [Method::Where, Method::Any, Method::First, Method::LastOrDefault] {
            let call = call(method, vec![Expr::root(user()), predicate()]);
            assert_eq!(recognize(&call), Some(SOURCE_AND_PREDICATE));
        }
    }

    #[test]
    fn test_rejects_other_shapes() {
        // Any without a predicate
        assert!(recognize(&call(Method::Any, vec![Expr::root(user())])).is_none());
        // Count is never a filter anchor
        assert!(recognize(&call(Method::other("Count"), vec![Expr::root(user()), predicate()])).is_none());
        // Second argument is not a lambda
        assert!(recognize(&call(Method::Where, vec![Expr::root(user()), Expr::value(true)])).is_none());
    }
}
