use super::rebuild_if_changed;
use model::query::{Expr, ExprRef, Lambda, Variable};
use std::sync::Arc;

/// Substitute every free occurrence of `from` with `to`.
///
/// Lambdas that bind `from` themselves shadow it, so their bodies are left
/// alone. Unchanged subtrees are returned as the same `Arc`.
pub fn replace_variable(expr: &ExprRef, from: &Variable, to: &Variable) -> ExprRef {
    if from == to {
        return expr.clone();
    }
    Replacer { from, to }.visit(expr)
}

struct Replacer<'a> {
    from: &'a Variable,
    to: &'a Variable,
}

impl Replacer<'_> {
    fn visit(&self, expr: &ExprRef) -> ExprRef {
        match expr.as_ref() {
            Expr::Variable(variable) if variable == self.from => self.to.expr(),

            Expr::Member { target, member } => {
                let new_target = self.visit(target);
                if Arc::ptr_eq(target, &new_target) {
                    expr.clone()
                } else {
                    Expr::member(new_target, member.clone())
                }
            }

            Expr::Unary { op, operand } => {
                let new_operand = self.visit(operand);
                if Arc::ptr_eq(operand, &new_operand) {
                    expr.clone()
                } else {
                    Expr::unary(*op, new_operand)
                }
            }

            Expr::Binary { left, op, right } => {
                let new_left = self.visit(left);
                let new_right = self.visit(right);
                if Arc::ptr_eq(left, &new_left) && Arc::ptr_eq(right, &new_right) {
                    expr.clone()
                } else {
                    Expr::binary(new_left, *op, new_right)
                }
            }

            Expr::Lambda(lambda) if lambda.binds(self.from) => expr.clone(),

            Expr::Lambda(lambda) => {
                let new_body = self.visit(&lambda.body);
                if Arc::ptr_eq(&lambda.body, &new_body) {
                    expr.clone()
                } else {
                    Lambda::new(lambda.parameters.clone(), new_body).into_expr()
                }
            }

            Expr::Quote(inner) => {
                let new_inner = self.visit(inner);
                if Arc::ptr_eq(inner, &new_inner) {
                    expr.clone()
                } else {
                    Expr::quote(new_inner)
                }
            }

            Expr::Call(call) => {
                let args: Vec<_> = call.args.iter().map(|arg| self.visit(arg)).collect();
                rebuild_if_changed(expr, call, args)
            }

            Expr::Constant(_) | Expr::Variable(_) | Expr::Parameter(_) | Expr::QueryRoot(_) => {
                expr.clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{core::identifiers::EntityType, query::Method};

    fn user() -> EntityType {
        EntityType::from("User")
    }

    #[test]
    fn test_replaces_free_occurrences() {
        let u = Variable::new("u", user());
        let x = Variable::new("x", user());
        let body = Expr::and(
            Expr::eq(u.field("tenant_id"), Expr::parameter("p0")),
            Expr::not(u.field("deleted")),
        );

        let replaced = replace_variable(&body, &u, &x);
        assert_eq!(
            replaced.to_string(),
            "((x.tenant_id == @p0) && !(x.deleted))"
        );
    }

    #[test]
    fn test_same_variable_is_identity() {
        let u = Variable::new("u", user());
        let body = Expr::not(u.field("deleted"));

        assert!(Arc::ptr_eq(&replace_variable(&body, &u, &u), &body));
    }

    #[test]
    fn test_shadowing_lambda_is_untouched() {
        let u = Variable::new("u", user());
        let x = Variable::new("x", user());
        let inner = Expr::quote(
            Lambda::predicate(u.clone(), Expr::eq(u.field("id"), Expr::value(1))).into_expr(),
        );
        let subquery = Expr::call(Method::Any, user(), vec![Expr::root(user()), inner.clone()]);
        let body = Expr::and(u.field("active"), subquery);

        let replaced = replace_variable(&body, &u, &x);
        assert_eq!(
            replaced.to_string(),
            "(x.active && Query<User>.Any(u => (u.id == 1)))"
        );
        let Expr::Binary { right, .. } = replaced.as_ref() else {
            panic!("expected a binary node");
        };
        let Expr::Call(call) = right.as_ref() else {
            panic!("expected a call node");
        };
        assert!(Arc::ptr_eq(&call.args[1], &inner));
    }
}
