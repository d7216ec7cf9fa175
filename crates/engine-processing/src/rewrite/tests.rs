use super::*;
use engine_core::{
    context::request::RequestContext,
    filter::{FilterDescriptor, FilterPlace, FilterRegistry},
};
use model::{
    core::identifiers::{Entity, FilterKind},
    query::{Captured, Query, Variable},
};
use std::collections::HashMap;
use tracing_test::traced_test;

struct User;
impl Entity for User {
    const NAME: &'static str = "User";
}

struct Article;
impl Entity for Article {
    const NAME: &'static str = "Article";
}

struct SoftDeletionFilter;

fn user() -> EntityType {
    EntityType::of::<User>()
}

fn article() -> EntityType {
    EntityType::of::<Article>()
}

fn tenant_filter(tenant: i64) -> FilterDescriptor {
    let t = Variable::new("t", user());
    let current = Captured::new("tenant", move || Value::Int(tenant));
    FilterDescriptor::new(
        user(),
        Lambda::predicate(t.clone(), Expr::eq(t.field("tenant_id"), Expr::captured(current))),
    )
    .unwrap()
    .named("Tenant")
    .with_place(FilterPlace::Head)
    .with_order(1)
}

fn soft_deletion_filter() -> FilterDescriptor {
    let d = Variable::new("d", user());
    FilterDescriptor::new(user(), Lambda::predicate(d.clone(), Expr::not(d.field("deleted"))))
        .unwrap()
        .named("SoftDeletion")
        .with_place(FilterPlace::Tail)
        .with_kind(FilterKind::of::<SoftDeletionFilter>())
}

fn field_filter(field: &str, place: FilterPlace, order: i32) -> FilterDescriptor {
    let v = Variable::new("v", user());
    FilterDescriptor::new(user(), Lambda::predicate(v.clone(), v.field(field)))
        .unwrap()
        .with_place(place)
        .with_order(order)
}

fn user_filters(tenant: i64) -> HashMap<EntityType, Vec<FilterDescriptor>> {
    HashMap::from([(user(), vec![tenant_filter(tenant), soft_deletion_filter()])])
}

fn u() -> Variable {
    Variable::new("u", user())
}

fn rewrite_query(
    source: HashMap<EntityType, Vec<FilterDescriptor>>,
    query: Query,
) -> (ExprRef, ExprRef, ParameterValues) {
    let (tree, mut params) = query.into_parts();
    let rewritten = FilterRewriter::new(source).rewrite(&tree, &mut params).unwrap();
    (tree, rewritten, params)
}

#[test]
fn test_entity_without_filters_is_unchanged() {
    let query = Query::from::<Article>().take(3);
    let (tree, rewritten, params) = rewrite_query(user_filters(7), query);

    assert!(Arc::ptr_eq(&tree, &rewritten));
    assert!(params.is_empty());
}

#[test]
fn test_all_filters_disabled_is_unchanged() {
    let source = HashMap::from([(user(), vec![soft_deletion_filter().with_enabled(false)])]);
    let (tree, rewritten, _) = rewrite_query(source, Query::from::<User>());

    assert!(Arc::ptr_eq(&tree, &rewritten));
}

#[traced_test]
#[test]
fn test_bare_root_gets_synthesized_where() {
    let (_, rewritten, params) = rewrite_query(user_filters(7), Query::from::<User>());

    assert_eq!(
        rewritten.to_string(),
        "Query<User>.Where(t => ((t.tenant_id == @__dynamic_filter_param__0) && !(t.deleted)))"
    );
    assert_eq!(params.get("__dynamic_filter_param__0"), Some(&Value::Int(7)));
    assert!(logs_contain("Applying 1 head and 1 tail filter(s) to User"));
}

#[test]
fn test_single_call_carries_head_and_tail() {
    let query = Query::from::<User>().filter(Lambda::predicate(u(), u().field("active")));
    let (_, rewritten, _) = rewrite_query(user_filters(7), query);

    assert_eq!(
        rewritten.to_string(),
        "Query<User>.Where(u => ((u.tenant_id == @__dynamic_filter_param__0) && (u.active && !(u.deleted))))"
    );
}

#[test]
fn test_chain_anchors_head_first_and_tail_last() {
    let x = Variable::new("x", user());
    let query = Query::from::<User>()
        .filter(Lambda::predicate(u(), u().field("active")))
        .take(10)
        .filter(Lambda::predicate(x.clone(), x.field("verified")));
    let (_, rewritten, _) = rewrite_query(user_filters(7), query);

    assert_eq!(
        rewritten.to_string(),
        "Query<User>.Where(u => ((u.tenant_id == @__dynamic_filter_param__0) && u.active))\
         .Take(10).Where(x => (x.verified && !(x.deleted)))"
    );
}

#[test]
fn test_filter_order_within_placement() {
    let source = HashMap::from([(
        user(),
        vec![
            field_filter("t2", FilterPlace::Tail, 2),
            field_filter("b", FilterPlace::Default, 5),
            field_filter("t1", FilterPlace::Tail, 1),
            field_filter("a", FilterPlace::Head, 1),
        ],
    )]);

    let query = Query::from::<User>().filter(Lambda::predicate(u(), u().field("x")));
    let (_, anchored, _) = rewrite_query(source.clone(), query);
    assert_eq!(
        anchored.to_string(),
        "Query<User>.Where(u => (u.a && (u.b && ((u.x && u.t1) && u.t2))))"
    );

    let (_, bare, _) = rewrite_query(source, Query::from::<User>());
    assert_eq!(
        bare.to_string(),
        "Query<User>.Where(v => (((v.a && v.b) && v.t1) && v.t2))"
    );
}

#[test]
fn test_operators_without_predicate_leave_root_bare() {
    let (_, rewritten, _) = rewrite_query(user_filters(7), Query::from::<User>().take(2).count());

    assert_eq!(
        rewritten.to_string(),
        "Query<User>.Where(t => ((t.tenant_id == @__dynamic_filter_param__0) && !(t.deleted))).Take(2).Count()"
    );
}

#[test]
fn test_ignore_filter_by_name_is_erased() {
    let query = Query::from::<User>()
        .ignore_filter("SoftDeletion")
        .filter(Lambda::predicate(u(), u().field("active")));
    let (_, rewritten, _) = rewrite_query(user_filters(7), query);

    assert_eq!(
        rewritten.to_string(),
        "Query<User>.Where(u => ((u.tenant_id == @__dynamic_filter_param__0) && u.active))"
    );
}

#[test]
fn test_ignore_filter_by_kind() {
    let query = Query::from::<User>().ignore_filter_kind::<SoftDeletionFilter>();
    let (_, rewritten, _) = rewrite_query(user_filters(7), query);

    assert_eq!(
        rewritten.to_string(),
        "Query<User>.Where(t => (t.tenant_id == @__dynamic_filter_param__0))"
    );
}

#[test]
fn test_ignore_every_filter_by_name_is_unchanged_below_marker() {
    let query = Query::from::<User>()
        .ignore_filter("SoftDeletion")
        .ignore_filter("Tenant");
    let (_, rewritten, params) = rewrite_query(user_filters(7), query);

    assert_eq!(rewritten.to_string(), "Query<User>");
    assert!(!params.contains("__dynamic_filter_param__0"));
}

#[test]
fn test_ignore_query_filters_keeps_tree() {
    let query = Query::from::<User>()
        .ignore_query_filters()
        .filter(Lambda::predicate(u(), u().field("active")));
    let (tree, rewritten, params) = rewrite_query(user_filters(7), query);

    assert!(Arc::ptr_eq(&tree, &rewritten));
    assert!(params.is_empty());
}

#[test]
fn test_malformed_ignore_filter_is_rejected() {
    let source = user_filters(7);
    let rewriter = FilterRewriter::new(source);

    // Literal instead of a parameter reference
    let literal = Expr::call(
        Method::IgnoreFilterByName,
        user(),
        vec![Expr::root(user()), Expr::value("Tenant")],
    );
    // Parameter that was never bound
    let unbound = Expr::call(
        Method::IgnoreFilterByName,
        user(),
        vec![Expr::root(user()), Expr::parameter("__ignore_filter_Tenant")],
    );

    for tree in [literal, unbound] {
        let err = rewriter
            .rewrite(&tree, &mut ParameterValues::new())
            .unwrap_err();
        assert!(matches!(err, RewriteError::InvalidIgnoreFilter { .. }));
    }

    let mut empty_name = ParameterValues::new();
    empty_name.add("name", Value::from("")).unwrap();
    let tree = Expr::call(
        Method::IgnoreFilterByName,
        user(),
        vec![Expr::root(user()), Expr::parameter("name")],
    );
    assert!(matches!(
        rewriter.rewrite(&tree, &mut empty_name),
        Err(RewriteError::InvalidIgnoreFilter { .. })
    ));
}

#[test]
fn test_non_query_top_level_is_unsupported() {
    let rewriter = FilterRewriter::new(user_filters(7));

    for tree in [Expr::value(1), Expr::eq(u().field("id"), Expr::value(1))] {
        let err = rewriter
            .rewrite(&tree, &mut ParameterValues::new())
            .unwrap_err();
        assert!(matches!(err, RewriteError::UnsupportedExpression { .. }));
    }
}

#[test]
fn test_subquery_gets_its_own_scope() {
    let a = Variable::new("a", article());
    let p = Variable::new("p", article());
    let published = FilterDescriptor::new(article(), Lambda::predicate(p.clone(), p.field("published")))
        .unwrap()
        .with_place(FilterPlace::Tail);
    let mut source = user_filters(7);
    source.insert(article(), vec![published]);

    let mut outer = Query::from::<User>();
    let subquery = Query::from::<Article>().any_where(Lambda::predicate(
        a.clone(),
        Expr::eq(a.field("author_id"), u().field("id")),
    ));
    let nested = outer.embed(subquery).unwrap();
    let query = outer.filter(Lambda::predicate(u(), nested));

    let (_, rewritten, _) = rewrite_query(source, query);
    assert_eq!(
        rewritten.to_string(),
        "Query<User>.Where(u => ((u.tenant_id == @__dynamic_filter_param__0) && \
         (Query<Article>.Any(a => ((a.author_id == u.id) && a.published)) && !(u.deleted))))"
    );
}

fn published_filter() -> FilterDescriptor {
    let p = Variable::new("p", article());
    FilterDescriptor::new(article(), Lambda::predicate(p.clone(), p.field("published")))
        .unwrap()
        .named("Published")
}

#[test]
fn test_ignore_filter_reaches_nested_subquery() {
    let x = Variable::new("x", user());
    let mut outer = Query::from::<User>().ignore_filter("Tenant");
    let managers = outer
        .embed(Query::from::<User>().any_where(Lambda::predicate(
            x.clone(),
            Expr::eq(x.field("id"), u().field("manager_id")),
        )))
        .unwrap();
    let query = outer.filter(Lambda::predicate(u(), managers));

    let (_, rewritten, params) = rewrite_query(user_filters(7), query);
    assert_eq!(
        rewritten.to_string(),
        "Query<User>.Where(u => (Query<User>.Any(x => ((x.id == u.manager_id) && !(x.deleted))) && !(u.deleted)))"
    );
    assert!(!params.contains("__dynamic_filter_param__0"));
}

#[test]
fn test_ignore_filter_stays_in_its_own_subquery() {
    let source = HashMap::from([(article(), vec![published_filter()])]);

    let mut outer = Query::from::<User>();
    let drafts_too = outer
        .embed(Query::from::<Article>().ignore_filter("Published").any())
        .unwrap();
    let published_only = outer.embed(Query::from::<Article>().any()).unwrap();
    let query = outer.filter(Lambda::predicate(u(), Expr::and(drafts_too, published_only)));

    let (_, rewritten, _) = rewrite_query(source, query);
    assert_eq!(
        rewritten.to_string(),
        "Query<User>.Where(u => (Query<Article>.Any() && Query<Article>.Where(p => p.published).Any()))"
    );
}

#[test]
fn test_ignore_filter_by_name_removes_every_descriptor_with_that_name() {
    let source = HashMap::from([(
        user(),
        vec![
            field_filter("a1", FilterPlace::Head, 1).named("A"),
            field_filter("b", FilterPlace::Default, 2).named("B"),
            field_filter("a2", FilterPlace::Tail, 1).named("A"),
        ],
    )]);

    let (_, all, _) = rewrite_query(source.clone(), Query::from::<User>());
    assert_eq!(all.to_string(), "Query<User>.Where(v => ((v.a1 && v.b) && v.a2))");

    let (_, without_a, _) = rewrite_query(source, Query::from::<User>().ignore_filter("A"));
    assert_eq!(without_a.to_string(), "Query<User>.Where(v => v.b)");
}

#[test]
fn test_every_root_gets_fresh_parameters() {
    let tree = Expr::call(
        Method::other("Concat"),
        user(),
        vec![Expr::root(user()), Expr::root(user())],
    );
    let mut params = ParameterValues::new();
    let rewritten = FilterRewriter::new(user_filters(7))
        .rewrite(&tree, &mut params)
        .unwrap();

    assert_eq!(
        rewritten.to_string(),
        "Query<User>.Where(t => ((t.tenant_id == @__dynamic_filter_param__0) && !(t.deleted)))\
         .Concat(Query<User>.Where(t => ((t.tenant_id == @__dynamic_filter_param__1) && !(t.deleted))))"
    );
    assert_eq!(params.len(), 2);
}

#[test]
fn test_shape_is_stable_across_captured_values() {
    let build = || Query::from::<User>().filter(Lambda::predicate(u(), u().field("active")));

    let (_, seven, seven_params) = rewrite_query(user_filters(7), build());
    let (_, nine, nine_params) = rewrite_query(user_filters(9), build());

    assert_eq!(seven.fingerprint(), nine.fingerprint());
    assert_eq!(seven_params.get("__dynamic_filter_param__0"), Some(&Value::Int(7)));
    assert_eq!(nine_params.get("__dynamic_filter_param__0"), Some(&Value::Int(9)));
}

#[test]
fn test_existing_parameter_name_collides() {
    let query = Query::from::<User>()
        .with_parameter("__dynamic_filter_param__0", Value::Int(1))
        .unwrap();
    let (tree, mut params) = query.into_parts();

    let err = FilterRewriter::new(user_filters(7))
        .rewrite(&tree, &mut params)
        .unwrap_err();
    assert!(matches!(err, RewriteError::Parameter(_)));
}

#[test]
fn test_registry_factories_see_request_context() {
    struct CurrentTenant(i64);

    let mut registry = FilterRegistry::new();
    registry.register(
        user(),
        Arc::new(|ctx: &RequestContext| -> engine_core::error::Result<FilterDescriptor> {
            let tenant = ctx.require::<CurrentTenant>()?.0;
            Ok(tenant_filter(tenant))
        }),
    );
    let ctx = RequestContext::new().with(CurrentTenant(42));

    let (tree, mut params) = Query::from::<User>().into_parts();
    FilterRewriter::new(registry.scoped(&ctx))
        .rewrite(&tree, &mut params)
        .unwrap();
    assert_eq!(params.get("__dynamic_filter_param__0"), Some(&Value::Int(42)));

    let err = FilterRewriter::new(registry.scoped(&RequestContext::new()))
        .rewrite(&tree, &mut ParameterValues::new())
        .unwrap_err();
    assert!(matches!(err, RewriteError::Filter(_)));
}
