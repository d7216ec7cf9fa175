use super::extractor::ParameterExtractor;
use engine_core::filter::FilterDescriptor;
use model::{
    core::identifiers::{FilterKind, FilterName},
    query::ParameterValues,
};
use std::collections::HashSet;

/// State shared by every scope of one rewrite pass.
pub(crate) struct PassState<'p> {
    pub params: &'p mut ParameterValues,
    /// Synthetic parameters created so far.
    pub counter: usize,
    pub ignore_all: bool,
}

impl<'p> PassState<'p> {
    pub fn new(params: &'p mut ParameterValues) -> Self {
        Self {
            params,
            counter: 0,
            ignore_all: false,
        }
    }

    pub fn extractor(&mut self) -> ParameterExtractor<'_> {
        ParameterExtractor::new(self.params, &mut self.counter)
    }
}

/// State local to one query scope: a call chain and the root it ends in.
///
/// Ignore directives flow down into nested scopes through [`child`](Self::child)
/// but never back up, so sibling subqueries do not see each other's ignores.
#[derive(Default)]
pub(crate) struct ScopeState {
    /// Filter-carrying calls entered so far, outermost first.
    pub chain_len: usize,
    pub head: Option<Vec<FilterDescriptor>>,
    pub tail: Option<Vec<FilterDescriptor>>,
    pub ignored_names: HashSet<FilterName>,
    pub ignored_kinds: HashSet<FilterKind>,
}

impl ScopeState {
    /// A fresh scope that starts with the ignores recorded so far.
    pub fn child(&self) -> Self {
        Self {
            ignored_names: self.ignored_names.clone(),
            ignored_kinds: self.ignored_kinds.clone(),
            ..Self::default()
        }
    }

    pub fn is_ignored(&self, filter: &FilterDescriptor) -> bool {
        filter
            .name()
            .is_some_and(|name| self.ignored_names.contains(name))
            || self.ignored_kinds.contains(&filter.kind())
    }

    /// Split the applicable filters into head (descending order) and tail
    /// (ascending order) lists. Both sorts are stable.
    pub fn partition(
        &self,
        filters: Vec<FilterDescriptor>,
    ) -> (Vec<FilterDescriptor>, Vec<FilterDescriptor>) {
        let (mut tail, mut head): (Vec<_>, Vec<_>) = filters
            .into_iter()
            .filter(|f| f.is_enabled() && !self.is_ignored(f))
            .partition(|f| f.place().is_tail());

        head.sort_by(|a, b| b.order().cmp(&a.order()));
        tail.sort_by_key(|f| f.order());
        (head, tail)
    }

    pub fn store(&mut self, head: Vec<FilterDescriptor>, tail: Vec<FilterDescriptor>) {
        self.head = (!head.is_empty()).then_some(head);
        self.tail = (!tail.is_empty()).then_some(tail);
    }
}
