use super::{
    expr::{Expr, ExprRef, Lambda},
    method::Method,
    params::ParameterValues,
};
use crate::{
    core::{
        identifiers::{Entity, EntityType, FilterKind},
        value::Value,
    },
    error::Result,
};

/// Prefix of the parameter that carries a name passed to
/// [`Query::ignore_filter`].
pub const IGNORE_FILTER_PARAM_PREFIX: &str = "__ignore_filter_";

/// Fluent builder for query expression trees.
///
/// Each operator wraps the current tree in a new call node, so the last
/// operator applied is the outermost node. The query carries its own
/// parameter table, which the execution side extends during rewriting.
#[derive(Debug, Clone)]
pub struct Query {
    expr: ExprRef,
    element: EntityType,
    params: ParameterValues,
}

impl Query {
    pub fn from<T: Entity>() -> Self {
        Self::of(EntityType::of::<T>())
    }

    pub fn of(entity: EntityType) -> Self {
        Self {
            expr: Expr::root(entity.clone()),
            element: entity,
            params: ParameterValues::new(),
        }
    }

    pub fn expr(&self) -> &ExprRef {
        &self.expr
    }

    pub fn element(&self) -> &EntityType {
        &self.element
    }

    pub fn parameters(&self) -> &ParameterValues {
        &self.params
    }

    pub fn into_parts(self) -> (ExprRef, ParameterValues) {
        (self.expr, self.params)
    }

    pub fn filter(self, predicate: Lambda) -> Self {
        self.with_predicate(Method::Where, predicate)
    }

    pub fn any(self) -> Self {
        self.apply(Method::Any, Vec::new())
    }

    pub fn any_where(self, predicate: Lambda) -> Self {
        self.with_predicate(Method::Any, predicate)
    }

    pub fn first(self, predicate: Lambda) -> Self {
        self.with_predicate(Method::First, predicate)
    }

    pub fn first_or_default(self, predicate: Lambda) -> Self {
        self.with_predicate(Method::FirstOrDefault, predicate)
    }

    pub fn last(self, predicate: Lambda) -> Self {
        self.with_predicate(Method::Last, predicate)
    }

    pub fn last_or_default(self, predicate: Lambda) -> Self {
        self.with_predicate(Method::LastOrDefault, predicate)
    }

    pub fn count(self) -> Self {
        self.apply(Method::other("Count"), Vec::new())
    }

    pub fn count_where(self, predicate: Lambda) -> Self {
        self.with_predicate(Method::other("Count"), predicate)
    }

    pub fn take(self, count: u64) -> Self {
        self.apply(Method::other("Take"), vec![Expr::value(count)])
    }

    /// Skip every filter registered under `name` for this query.
    ///
    /// The name travels as a parameter reference so the tree shape does not
    /// depend on which filter is ignored.
    pub fn ignore_filter(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let key = format!("{IGNORE_FILTER_PARAM_PREFIX}{name}");
        self.params.set(key.clone(), Value::String(name));
        self.apply(Method::IgnoreFilterByName, vec![Expr::parameter(key)])
    }

    /// Skip every filter produced by the filter type `F`.
    pub fn ignore_filter_kind<F: 'static>(self) -> Self {
        self.apply(Method::IgnoreFilterByKind(FilterKind::of::<F>()), Vec::new())
    }

    pub fn ignore_query_filters(self) -> Self {
        self.apply(Method::IgnoreQueryFilters, Vec::new())
    }

    /// Bind an explicit parameter for `Parameter` nodes used in predicates.
    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Result<Self> {
        self.params.add(name, value)?;
        Ok(self)
    }

    /// Take over a subquery's parameters and return its tree for use inside
    /// one of this query's predicates.
    pub fn embed(&mut self, subquery: Query) -> Result<ExprRef> {
        self.params.merge(&subquery.params)?;
        Ok(subquery.expr)
    }

    fn with_predicate(self, method: Method, predicate: Lambda) -> Self {
        let quoted = Expr::quote(predicate.into_expr());
        self.apply(method, vec![quoted])
    }

    fn apply(mut self, method: Method, extra: Vec<ExprRef>) -> Self {
        let mut args = Vec::with_capacity(extra.len() + 1);
        args.push(self.expr);
        args.extend(extra);
        self.expr = Expr::call(method, self.element.clone(), args);
        self
    }
}
