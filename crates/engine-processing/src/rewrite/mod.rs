pub mod combiner;
mod context;
pub mod extractor;
pub mod operators;
pub mod replacer;

#[cfg(test)]
mod tests;

use crate::error::{Result, RewriteError};
use context::{PassState, ScopeState};
use engine_core::filter::FilterSource;
use model::{
    core::{identifiers::EntityType, value::Value},
    query::{Expr, ExprRef, Lambda, Method, MethodCall, ParameterValues},
};
use operators::OperatorShape;
use std::sync::Arc;
use tracing::debug;

/// Splices dynamic filters into query expression trees.
///
/// One [`rewrite`](Self::rewrite) call walks the tree once. Each query root
/// gets the filters registered for its entity type, anchored to the call
/// chain of the scope the root belongs to: head filters on the call nearest
/// the root, tail filters on the call nearest the caller. Predicates of
/// nested queries start their own scope, which inherits the ignore directives
/// of the enclosing one.
pub struct FilterRewriter<S> {
    source: S,
}

impl<S: FilterSource> FilterRewriter<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Rewrite `tree`, binding synthesized parameters into `params`.
    ///
    /// Returns the same `Arc` when no filter applies.
    pub fn rewrite(&self, tree: &ExprRef, params: &mut ParameterValues) -> Result<ExprRef> {
        let mut pass = PassState::new(params);
        let mut scope = ScopeState::default();

        let rewritten = self.resolve(tree, &mut pass, &mut scope)?;
        if !Arc::ptr_eq(tree, &rewritten) {
            debug!(
                "Rewrote query with dynamic filters ({} parameter(s) extracted): {}",
                pass.counter, rewritten
            );
        }
        Ok(rewritten)
    }

    /// Walk a node that must be query-shaped, in the current scope.
    fn resolve(&self, expr: &ExprRef, pass: &mut PassState, scope: &mut ScopeState) -> Result<ExprRef> {
        match expr.as_ref() {
            Expr::Call(call) => self.resolve_call(expr, call, pass, scope),
            Expr::QueryRoot(entity) => self.resolve_root(expr, entity, pass, scope),
            Expr::Quote(inner) => {
                let new_inner = self.resolve(inner, pass, scope)?;
                Ok(if Arc::ptr_eq(inner, &new_inner) {
                    expr.clone()
                } else {
                    Expr::quote(new_inner)
                })
            }
            Expr::Lambda(lambda) => self.resolve_lambda(expr, lambda, pass, scope),
            _ => Err(RewriteError::unsupported(expr)),
        }
    }

    /// Walk a node in a new scope below `parent`.
    fn resolve_nested(
        &self,
        expr: &ExprRef,
        pass: &mut PassState,
        parent: &ScopeState,
    ) -> Result<ExprRef> {
        let mut scope = parent.child();
        self.resolve_argument(expr, pass, &mut scope)
    }

    /// Walk a node that may or may not contain queries. Leaves stay as they
    /// are; each operand of an operator is its own scope.
    fn resolve_argument(
        &self,
        expr: &ExprRef,
        pass: &mut PassState,
        scope: &mut ScopeState,
    ) -> Result<ExprRef> {
        match expr.as_ref() {
            Expr::Call(_) | Expr::QueryRoot(_) | Expr::Quote(_) => self.resolve(expr, pass, scope),

            Expr::Lambda(lambda) => self.resolve_lambda(expr, lambda, pass, scope),

            Expr::Member { target, member } => {
                let new_target = self.resolve_nested(target, pass, scope)?;
                Ok(if Arc::ptr_eq(target, &new_target) {
                    expr.clone()
                } else {
                    Expr::member(new_target, member.clone())
                })
            }

            Expr::Unary { op, operand } => {
                let new_operand = self.resolve_nested(operand, pass, scope)?;
                Ok(if Arc::ptr_eq(operand, &new_operand) {
                    expr.clone()
                } else {
                    Expr::unary(*op, new_operand)
                })
            }

            Expr::Binary { left, op, right } => {
                let new_left = self.resolve_nested(left, pass, scope)?;
                let new_right = self.resolve_nested(right, pass, scope)?;
                Ok(
                    if Arc::ptr_eq(left, &new_left) && Arc::ptr_eq(right, &new_right) {
                        expr.clone()
                    } else {
                        Expr::binary(new_left, *op, new_right)
                    },
                )
            }

            Expr::Constant(_) | Expr::Variable(_) | Expr::Parameter(_) => Ok(expr.clone()),
        }
    }

    /// A lambda body continues the scope of the lambda itself.
    fn resolve_lambda(
        &self,
        expr: &ExprRef,
        lambda: &Lambda,
        pass: &mut PassState,
        scope: &mut ScopeState,
    ) -> Result<ExprRef> {
        let new_body = self.resolve_argument(&lambda.body, pass, scope)?;
        Ok(if Arc::ptr_eq(&lambda.body, &new_body) {
            expr.clone()
        } else {
            Lambda::new(lambda.parameters.clone(), new_body).into_expr()
        })
    }

    fn resolve_call(
        &self,
        expr: &ExprRef,
        call: &MethodCall,
        pass: &mut PassState,
        scope: &mut ScopeState,
    ) -> Result<ExprRef> {
        match &call.method {
            Method::IgnoreFilterByName => {
                let (source, name) = self.ignored_name(expr, call, pass)?;
                debug!("Ignoring dynamic filter '{}' for {}", name, call.element);
                scope.ignored_names.insert(name.into());
                self.resolve(source, pass, scope)
            }

            Method::IgnoreFilterByKind(kind) => {
                let source = call
                    .args
                    .first()
                    .ok_or_else(|| RewriteError::unsupported(expr))?;
                debug!("Ignoring dynamic filters of kind {} for {}", kind, call.element);
                scope.ignored_kinds.insert(*kind);
                self.resolve(source, pass, scope)
            }

            Method::IgnoreQueryFilters => {
                // The marker stays in the tree for the executor to see
                pass.ignore_all = true;
                let Some(source) = call.args.first() else {
                    return Ok(expr.clone());
                };
                let new_source = self.resolve(source, pass, scope)?;
                let mut args = call.args.clone();
                args[0] = new_source;
                Ok(rebuild_if_changed(expr, call, args))
            }

            _ => match operators::recognize(call) {
                Some(shape) => self.resolve_query_operator(expr, call, shape, pass, scope),
                None => self.resolve_other(expr, call, pass, scope),
            },
        }
    }

    /// Validate an ignore-by-name marker: its argument must be a parameter
    /// bound to a non-empty string.
    fn ignored_name<'c>(
        &self,
        expr: &ExprRef,
        call: &'c MethodCall,
        pass: &PassState,
    ) -> Result<(&'c ExprRef, String)> {
        let invalid = || RewriteError::InvalidIgnoreFilter {
            expression: expr.to_string(),
        };

        let [source, name] = call.args.as_slice() else {
            return Err(invalid());
        };
        let Expr::Parameter(parameter) = name.as_ref() else {
            return Err(invalid());
        };
        match pass.params.get(parameter) {
            Some(Value::String(name)) if !name.is_empty() => Ok((source, name.clone())),
            _ => Err(invalid()),
        }
    }

    fn resolve_query_operator(
        &self,
        expr: &ExprRef,
        call: &MethodCall,
        shape: OperatorShape,
        pass: &mut PassState,
        scope: &mut ScopeState,
    ) -> Result<ExprRef> {
        scope.chain_len += 1;
        let position = scope.chain_len;
        let is_last = position == 1;

        let source = &call.args[shape.source];
        let predicate = &call.args[shape.predicate];

        let new_source = self.resolve(source, pass, scope)?;
        // No deeper call joined the chain, so this one is nearest the root
        let is_first = scope.chain_len == position;

        let mut new_predicate = self.resolve_nested(predicate, pass, scope)?;
        if is_last {
            if let Some(tail) = scope.tail.as_deref() {
                new_predicate =
                    combiner::conjoin_predicate(&new_predicate, tail, &mut pass.extractor())?;
            }
        }
        if is_first {
            if let Some(head) = scope.head.as_deref() {
                new_predicate =
                    combiner::conjoin_predicate(&new_predicate, head, &mut pass.extractor())?;
            }
        }

        let mut args = call.args.clone();
        args[shape.source] = new_source;
        args[shape.predicate] = new_predicate;
        Ok(rebuild_if_changed(expr, call, args))
    }

    /// Calls without filter semantics. The first argument continues the
    /// current query, every other argument is a query of its own.
    fn resolve_other(
        &self,
        expr: &ExprRef,
        call: &MethodCall,
        pass: &mut PassState,
        scope: &mut ScopeState,
    ) -> Result<ExprRef> {
        let mut args = Vec::with_capacity(call.args.len());
        for (i, arg) in call.args.iter().enumerate() {
            args.push(if i == 0 {
                self.resolve_argument(arg, pass, scope)?
            } else {
                self.resolve_nested(arg, pass, scope)?
            });
        }
        Ok(rebuild_if_changed(expr, call, args))
    }

    fn resolve_root(
        &self,
        expr: &ExprRef,
        entity: &EntityType,
        pass: &mut PassState,
        scope: &mut ScopeState,
    ) -> Result<ExprRef> {
        if pass.ignore_all {
            debug!("Query filters ignored for {}", entity);
            return Ok(expr.clone());
        }

        let Some(filters) = self.source.filters_for(entity)? else {
            return Ok(expr.clone());
        };

        let (head, tail) = scope.partition(filters);
        debug!(
            "Applying {} head and {} tail filter(s) to {}",
            head.len(),
            tail.len(),
            entity
        );

        if scope.chain_len > 0 {
            scope.store(head, tail);
            return Ok(expr.clone());
        }

        // Bare root: no call in this scope to carry the filters
        let ordered = head.iter().rev().chain(tail.iter());
        let Some(predicate) = combiner::conjoin_all(ordered, &mut pass.extractor())? else {
            return Ok(expr.clone());
        };
        debug!("Synthesized filter call for bare query over {}", entity);
        Ok(Expr::call(
            Method::Where,
            entity.clone(),
            vec![expr.clone(), Expr::quote(predicate.into_expr())],
        ))
    }
}

/// A new call node with `args`, or `expr` itself if every argument is the
/// same node as before.
pub(crate) fn rebuild_if_changed(expr: &ExprRef, call: &MethodCall, args: Vec<ExprRef>) -> ExprRef {
    let unchanged = call.args.len() == args.len()
        && call.args.iter().zip(&args).all(|(old, new)| Arc::ptr_eq(old, new));
    if unchanged {
        expr.clone()
    } else {
        Arc::new(Expr::Call(call.with_args(args)))
    }
}
