use crate::{
    cache::PlanCache,
    error::Result,
    executor::{Executor, QueryOutput, load_snapshot},
    store::QueryStore,
};
use engine_config::DynamicFilterSettings;
use engine_core::{
    context::request::RequestContext,
    filter::{FilterDescriptor, FilterRegistry},
};
use engine_processing::FilterRewriter;
use model::{
    core::identifiers::EntityType,
    query::{ExprRef, ParameterValues, Query},
};
use std::{collections::HashMap, sync::Arc, time::Instant};
use tracing::{debug, warn};
use uuid::Uuid;

/// A query tree ready for execution together with the parameters it
/// refers to.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub tree: ExprRef,
    pub parameters: ParameterValues,
}

/// Runs queries on behalf of one request.
///
/// The registry, store and plan cache are shared between sessions; the
/// request context belongs to this session alone.
pub struct QuerySession {
    id: Uuid,
    registry: Arc<FilterRegistry>,
    context: RequestContext,
    settings: DynamicFilterSettings,
    store: Arc<dyn QueryStore>,
    cache: Arc<PlanCache>,
}

impl QuerySession {
    pub fn new(
        registry: Arc<FilterRegistry>,
        store: Arc<dyn QueryStore>,
        cache: Arc<PlanCache>,
        context: RequestContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            registry,
            context,
            settings: DynamicFilterSettings::default(),
            store,
            cache,
        }
    }

    pub fn with_settings(mut self, settings: DynamicFilterSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Rewrite `query` with the filters of this request. The query itself
    /// is left untouched; its parameters are copied.
    pub fn prepare(&self, query: &Query) -> Result<PreparedQuery> {
        let mut parameters = query.parameters().clone();

        let tree = if self.settings.enabled {
            let rewriter = FilterRewriter::new(self.registry.scoped(&self.context));
            rewriter.rewrite(query.expr(), &mut parameters)?
        } else {
            // Still consumes ignore markers, with nothing to apply
            warn!("[{}] Dynamic filters are disabled, running query unfiltered", self.id);
            let rewriter = FilterRewriter::new(HashMap::<EntityType, Vec<FilterDescriptor>>::new());
            rewriter.rewrite(query.expr(), &mut parameters)?
        };

        Ok(PreparedQuery { tree, parameters })
    }

    pub async fn execute(&self, query: &Query) -> Result<QueryOutput> {
        let start = Instant::now();
        let prepared = self.prepare(query)?;

        let plan = self.cache.get_or_compile(&prepared.tree).await;
        let snapshot = load_snapshot(self.store.as_ref(), plan.entities()).await?;
        let output = Executor::new(&snapshot, &prepared.parameters).execute(&prepared.tree)?;

        debug!(
            "[{}] Executed plan {:016x} in {:?}",
            self.id,
            plan.fingerprint(),
            start.elapsed()
        );
        Ok(output)
    }
}
