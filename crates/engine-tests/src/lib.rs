use engine_config::{DynamicFilterSettings, FilterOptions, FilterSpec};
use engine_core::{
    context::request::RequestContext,
    error::Result as FilterResult,
    filter::{DynamicQueryFilter, FilterPlace, FilterRegistry, FromRequest},
};
use engine_runtime::{InMemoryStore, PlanCache, QueryStore, QuerySession};
use model::{
    core::{
        identifiers::{Entity, EntityType, FilterName},
        value::Value,
    },
    query::{Captured, Expr, Lambda, Variable},
    records::row::RowData,
};
use std::sync::Arc;
use tracing::info;

pub mod utils;

pub struct User;
impl Entity for User {
    const NAME: &'static str = "User";
}

pub struct Article;
impl Entity for Article {
    const NAME: &'static str = "Article";
}

/// Request service naming the caller's tenant.
pub struct CurrentTenant(pub i64);

/// Restricts users to the current tenant.
pub struct TenantFilter {
    tenant: i64,
}

impl DynamicQueryFilter for TenantFilter {
    type Entity = User;

    fn predicate(&self) -> Lambda {
        let tenant = self.tenant;
        let u = Variable::new("u", EntityType::of::<User>());
        let current = Captured::new("current_tenant", move || Value::Int(tenant));
        Lambda::predicate(u.clone(), Expr::eq(u.field("tenant_id"), Expr::captured(current)))
    }

    fn name(&self) -> Option<FilterName> {
        Some("Tenant".into())
    }

    fn order(&self) -> i32 {
        1
    }

    fn place(&self) -> FilterPlace {
        FilterPlace::Head
    }
}

impl FromRequest for TenantFilter {
    fn from_request(ctx: &RequestContext) -> FilterResult<Self> {
        let current = ctx.require::<CurrentTenant>()?;
        Ok(Self { tenant: current.0 })
    }
}

pub fn user() -> EntityType {
    EntityType::of::<User>()
}

pub fn article() -> EntityType {
    EntityType::of::<Article>()
}

/// Tenant scoping and soft deletion on users, publication on articles.
pub fn registry(settings: &DynamicFilterSettings) -> Arc<FilterRegistry> {
    let mut options = FilterOptions::new();
    options
        .entity::<User, _>(|users| {
            let d = Variable::new("d", user());
            users
                .add_typed_filter::<TenantFilter>()
                .add_tail_filter(
                    FilterSpec::new(Lambda::predicate(d.clone(), Expr::not(d.field("deleted"))))
                        .named("SoftDeletion"),
                );
        })
        .entity::<Article, _>(|articles| {
            let a = Variable::new("a", article());
            articles.add_filter(
                FilterSpec::new(Lambda::predicate(a.clone(), a.field("published")))
                    .named("Published"),
            );
        })
        .with_settings(settings);

    Arc::new(options.build().expect("fixture filters are valid"))
}

fn user_row(id: i64, tenant_id: i64, name: &str, deleted: bool) -> RowData {
    RowData::new(
        user(),
        [
            ("id", Value::Int(id)),
            ("tenant_id", Value::Int(tenant_id)),
            ("name", Value::from(name)),
            ("deleted", Value::Boolean(deleted)),
        ],
    )
}

fn article_row(id: i64, author_id: i64, published: bool) -> RowData {
    RowData::new(
        article(),
        [
            ("id", Value::Int(id)),
            ("author_id", Value::Int(author_id)),
            ("published", Value::Boolean(published)),
        ],
    )
}

/// Three users in tenant 7 (one deleted), two in tenant 9, and a few
/// articles by some of them.
pub async fn seed_store() -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    store
        .extend([
            user_row(1, 7, "ann", false),
            user_row(2, 7, "bob", true),
            user_row(3, 7, "cid", false),
            user_row(4, 9, "dee", false),
            user_row(5, 9, "eve", false),
            article_row(100, 1, true),
            article_row(101, 2, true),
            article_row(102, 4, false),
            article_row(103, 5, true),
        ])
        .await;
    info!("Seeded in-memory store with 5 users and 4 articles");
    Arc::new(store)
}

/// Everything shared between the sessions of one test.
pub struct Fixture {
    pub registry: Arc<FilterRegistry>,
    pub store: Arc<InMemoryStore>,
    pub cache: Arc<PlanCache>,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_settings(&DynamicFilterSettings::default()).await
    }

    pub async fn with_settings(settings: &DynamicFilterSettings) -> Self {
        Self {
            registry: registry(settings),
            store: seed_store().await,
            cache: Arc::new(PlanCache::new()),
        }
    }

    /// A session for a caller in `tenant`.
    pub fn session(&self, tenant: i64) -> QuerySession {
        self.session_with(RequestContext::new().with(CurrentTenant(tenant)))
    }

    pub fn session_with(&self, context: RequestContext) -> QuerySession {
        let store: Arc<dyn QueryStore> = self.store.clone();
        QuerySession::new(self.registry.clone(), store, self.cache.clone(), context)
    }
}
