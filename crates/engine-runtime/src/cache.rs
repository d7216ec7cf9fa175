use model::{
    core::identifiers::EntityType,
    query::{Constant, Expr},
};
use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::RwLock;
use tracing::debug;

/// What execution needs to know about a query shape ahead of time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPlan {
    fingerprint: u64,
    entities: Vec<EntityType>,
}

impl CompiledPlan {
    pub fn compile(tree: &Expr) -> Self {
        let mut entities = BTreeSet::new();
        collect_roots(tree, &mut entities);
        Self {
            fingerprint: tree.fingerprint(),
            entities: entities.into_iter().collect(),
        }
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Entity types read by the query, sorted.
    pub fn entities(&self) -> &[EntityType] {
        &self.entities
    }
}

fn collect_roots(expr: &Expr, entities: &mut BTreeSet<EntityType>) {
    match expr {
        Expr::QueryRoot(entity) => {
            entities.insert(entity.clone());
        }
        Expr::Call(call) => call.args.iter().for_each(|arg| collect_roots(arg, entities)),
        Expr::Member { target, .. } => collect_roots(target, entities),
        Expr::Unary { operand, .. } => collect_roots(operand, entities),
        Expr::Binary { left, right, .. } => {
            collect_roots(left, entities);
            collect_roots(right, entities);
        }
        Expr::Lambda(lambda) => collect_roots(&lambda.body, entities),
        Expr::Quote(inner) => collect_roots(inner, entities),
        Expr::Constant(Constant::Value(_) | Constant::Captured(_))
        | Expr::Variable(_)
        | Expr::Parameter(_) => {}
    }
}

/// Compiled plans keyed by the fingerprint of the rewritten tree.
///
/// Rewritten trees carry parameter names instead of captured values, so
/// requests that differ only in those values share one entry.
#[derive(Debug, Default)]
pub struct PlanCache {
    plans: RwLock<HashMap<u64, Arc<CompiledPlan>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_compile(&self, tree: &Expr) -> Arc<CompiledPlan> {
        let fingerprint = tree.fingerprint();

        if let Some(plan) = self.plans.read().await.get(&fingerprint) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!("Reusing compiled plan {:016x}", fingerprint);
            return plan.clone();
        }

        let mut plans = self.plans.write().await;
        if let Some(plan) = plans.get(&fingerprint) {
            // Compiled by a concurrent caller in between
            self.hits.fetch_add(1, Ordering::Relaxed);
            return plan.clone();
        }

        let plan = Arc::new(CompiledPlan::compile(tree));
        plans.insert(fingerprint, plan.clone());
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Cached compiled plan {:016x} reading {:?}",
            fingerprint,
            plan.entities()
        );
        plan
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.plans.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.plans.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.plans.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::query::{Lambda, Query, Variable};

    fn user() -> EntityType {
        EntityType::from("User")
    }

    #[test]
    fn test_compile_collects_nested_roots() {
        let u = Variable::new("u", user());
        let o = Variable::new("o", EntityType::from("Order"));
        let has_orders = Query::of(EntityType::from("Order")).any_where(Lambda::predicate(
            o.clone(),
            Expr::eq(o.field("user_id"), u.field("id")),
        ));
        let query = Query::of(user()).filter(Lambda::predicate(u, has_orders.expr().clone()));

        let plan = CompiledPlan::compile(query.expr());
        assert_eq!(plan.entities(), [EntityType::from("Order"), user()].as_slice());
    }

    #[tokio::test]
    async fn test_same_shape_hits() {
        let cache = PlanCache::new();
        let tree = Query::of(user()).take(1).count();

        let first = cache.get_or_compile(tree.expr()).await;
        let second = cache.get_or_compile(Query::of(user()).take(1).count().expr()).await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
        assert_eq!(cache.len().await, 1);

        cache.get_or_compile(Query::of(user()).take(2).expr()).await;
        assert_eq!(cache.misses(), 2);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
