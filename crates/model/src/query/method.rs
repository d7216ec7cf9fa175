use crate::core::identifiers::FilterKind;
use std::fmt;

/// Query operator invoked by a [`MethodCall`](super::expr::MethodCall).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Where,
    Any,
    First,
    FirstOrDefault,
    Last,
    LastOrDefault,
    /// Drops the named filters from the query it wraps.
    IgnoreFilterByName,
    /// Drops every filter produced by the given kind.
    IgnoreFilterByKind(FilterKind),
    /// Disables filtering for the whole query.
    IgnoreQueryFilters,
    /// Any operator without filter semantics (`Count`, `Take`, ...).
    Other(String),
}

impl Method {
    pub fn other(name: impl Into<String>) -> Self {
        Method::Other(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Method::Where => "Where",
            Method::Any => "Any",
            Method::First => "First",
            Method::FirstOrDefault => "FirstOrDefault",
            Method::Last => "Last",
            Method::LastOrDefault => "LastOrDefault",
            Method::IgnoreFilterByName => "IgnoreFilter",
            Method::IgnoreFilterByKind(_) => "IgnoreFilter",
            Method::IgnoreQueryFilters => "IgnoreQueryFilters",
            Method::Other(name) => name,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::IgnoreFilterByKind(kind) => write!(f, "IgnoreFilter<{kind}>"),
            other => f.write_str(other.name()),
        }
    }
}
