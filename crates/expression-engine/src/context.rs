use crate::error::Result;
use model::{
    core::value::Value,
    query::{Expr, ParameterValues, Variable},
};

/// Runs a query tree found inside a predicate, such as
/// `Query<User>.Any(u => ...)` nested in a filter over another entity.
pub trait SubqueryExecutor {
    fn evaluate_subquery(&self, query: &Expr, ctx: &EvalContext) -> Result<Value>;
}

/// Values bound to lambda variables, innermost binding last.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: Vec<(Variable, Value)>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of these bindings with `variable` bound to `value`, shadowing
    /// any outer binding of the same variable.
    pub fn with(&self, variable: Variable, value: Value) -> Self {
        let mut entries = self.entries.clone();
        entries.push((variable, value));
        Self { entries }
    }

    pub fn lookup(&self, variable: &Variable) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|(bound, _)| bound == variable)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Evaluation context that provides access to different data sources
/// depending on whether we're evaluating closed-over state or a row predicate
pub enum EvalContext<'a> {
    /// Only literals and captured values are reachable.
    Constant,
    /// Predicate evaluation: parameters of the running query, bound row
    /// variables and an optional hook for nested queries.
    Row {
        parameters: &'a ParameterValues,
        bindings: &'a Bindings,
        subqueries: Option<&'a dyn SubqueryExecutor>,
    },
}

impl<'a> EvalContext<'a> {
    pub fn row(
        parameters: &'a ParameterValues,
        bindings: &'a Bindings,
        subqueries: Option<&'a dyn SubqueryExecutor>,
    ) -> Self {
        EvalContext::Row {
            parameters,
            bindings,
            subqueries,
        }
    }

    pub fn get_parameter(&self, name: &str) -> Option<&Value> {
        match self {
            EvalContext::Constant => None,
            EvalContext::Row { parameters, .. } => parameters.get(name),
        }
    }

    pub fn lookup(&self, variable: &Variable) -> Option<&Value> {
        match self {
            EvalContext::Constant => None,
            EvalContext::Row { bindings, .. } => bindings.lookup(variable),
        }
    }

    pub fn parameters(&self) -> Option<&'a ParameterValues> {
        match self {
            EvalContext::Constant => None,
            EvalContext::Row { parameters, .. } => Some(parameters),
        }
    }

    pub fn bindings(&self) -> Option<&'a Bindings> {
        match self {
            EvalContext::Constant => None,
            EvalContext::Row { bindings, .. } => Some(bindings),
        }
    }

    pub fn subqueries(&self) -> Option<&'a dyn SubqueryExecutor> {
        match self {
            EvalContext::Constant => None,
            EvalContext::Row { subqueries, .. } => *subqueries,
        }
    }
}
