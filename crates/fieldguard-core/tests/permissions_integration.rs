//! Integration tests for security groups, evaluation and resolver wrapping.

use fieldguard_core::relation::{Entity, MissingRelation, RelationCheck, RelationResolvers};
use fieldguard_core::resolver::{
    resolver_fn, resolver_wrapper, wrap_resolvers, RequestContext, ResolveInfo, Resolved,
    Resolver, ResolverMap,
};
use fieldguard_core::rules::{merge_security_groups, EntityRules, GroupCache, RuleSet, SecurityGroup};
use fieldguard_core::schema::{
    default_ruleset, verify_schema_and_resolvers, DiagnosticKind, EnumValueDef, SchemaCatalog,
    TypeDef,
};
use fieldguard_core::{check_inbound_query_field, secure_inbound_query_fields, secure_result};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Viewer {
    id: String,
    mentor: Option<String>,
    dummy: bool,
}

impl Viewer {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    fn dummy(mut self, dummy: bool) -> Self {
        self.dummy = dummy;
        self
    }
}

fn entity(value: Value) -> Entity {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn target_id(target: &Entity) -> Option<&str> {
    target.get("id").and_then(Value::as_str)
}

fn relations() -> RelationResolvers<Viewer> {
    RelationResolvers::new()
        .relation("Employee", "any", |_: &Viewer, _: &Entity| true)
        .relation("Employee", "own", |viewer: &Viewer, target: &Entity| {
            target_id(target) == Some(viewer.id.as_str())
        })
        .relation("Employee", "superior", |viewer: &Viewer, target: &Entity| {
            viewer.mentor.is_some() && viewer.mentor.as_deref() == target_id(target)
        })
        .relation("Employee", "active", |_: &Viewer, target: &Entity| {
            let suspended = target.get("suspended").and_then(Value::as_bool);
            RelationCheck::deferred(async move { Ok(!suspended.unwrap_or(false)) })
        })
        .relation("Employee", "dummy", |viewer: &Viewer, _: &Entity| viewer.dummy)
}

fn catalog() -> SchemaCatalog {
    SchemaCatalog::default()
        .with_type(TypeDef::object("Query", ["employee", "employees", "project"]))
        .with_type(TypeDef::object(
            "Employee",
            ["id", "first_name", "email", "ownProp"],
        ))
        .with_type(TypeDef::object("Project", ["id", "name"]))
        .with_relations(
            "Employee",
            None,
            [
                EnumValueDef::new("any").with_description("Any relation of the user to the target employee"),
                EnumValueDef::new("own").with_description("Currently logged in user is the target employee"),
                EnumValueDef::new("superior"),
                EnumValueDef::new("active").with_description("Target employee is actively employed"),
                EnumValueDef::new("dummy").with_description("Viewer is marked as dummy"),
            ],
        )
        .with_relations("Project", None, [EnumValueDef::new("any"), EnumValueDef::new("own")])
        .with_relations("Query", None, [EnumValueDef::new("any")])
}

fn test_group() -> SecurityGroup {
    SecurityGroup::new("test Group")
        .with_entity(
            "Query",
            EntityRules::new()
                .with_row(RuleSet::new().with("any", true))
                .with_col("employee", RuleSet::new().with("any", true))
                .with_col("employees", RuleSet::new().with("any", true)),
        )
        .with_entity(
            "Employee",
            EntityRules::new()
                .with_row(RuleSet::new().with("any", true))
                .with_col("id", RuleSet::new().with("any", true))
                .with_col("ownProp", RuleSet::new().with("own", false))
                .with_col("first_name", RuleSet::new().with("own", true))
                .with_col(
                    "email",
                    RuleSet::new()
                        .with("any", true)
                        .with("own", false)
                        .with("else", false),
                ),
        )
        .with_entity(
            "Project",
            EntityRules::new().with_row(RuleSet::new().with("any", false).with("own", false)),
        )
}

fn sec_group() -> SecurityGroup {
    merge_security_groups(&[&default_ruleset(&catalog()), &test_group()])
}

fn dummy_only_group() -> SecurityGroup {
    let dummies = SecurityGroup::new("test Group 2").with_entity(
        "Employee",
        EntityRules::new().with_row(RuleSet::new().with("any", false).with("dummy", true)),
    );
    merge_security_groups(&[&sec_group(), &dummies])
}

fn employees() -> Value {
    json!([
        { "id": "id1", "first_name": "first_name", "email": "email" },
        { "id": "id2", "first_name": "first_name2", "email": "email2" }
    ])
}

async fn run(base: Resolver<Viewer>, ctx: &RequestContext<Viewer>, info: &ResolveInfo) -> Value {
    let wrapped = resolver_wrapper(base, Arc::new(relations()));
    wrapped(&Value::Null, &Value::Null, ctx, info)
        .settle()
        .await
        .unwrap()
}

#[test]
fn test_merged_group_names_ignore_default() {
    assert_eq!(sec_group().name, "__test group");
    assert_eq!(dummy_only_group().name, "__test group_test group 2");
}

#[tokio::test]
async fn test_secure_result() {
    let resolvers = relations();
    let group = sec_group();
    let demo_employee = entity(json!({
        "id": "test_empl1",
        "ownProp": "woot woot",
        "email": "test@mail.com"
    }));

    let secured = secure_result(
        resolvers.get("Employee").unwrap(),
        &Viewer::new("test_empl"),
        group.entity_rules("Employee").unwrap(),
        &demo_employee,
    )
    .await
    .unwrap();

    assert_eq!(
        secured,
        Some(entity(json!({ "id": "test_empl1", "email": "test@mail.com" })))
    );
}

#[test]
fn test_inbound_checks() {
    let group = sec_group();

    assert!(!check_inbound_query_field("Project", "id", &group));
    assert!(check_inbound_query_field("Employee", "id", &group));
    assert!(!check_inbound_query_field("Employee", "ownProp", &group));
    assert!(check_inbound_query_field("Employee", "email", &group));

    assert_eq!(secure_inbound_query_fields("Project", ["id"], &group), None);
    assert_eq!(
        secure_inbound_query_fields("Employee", ["id"], &group),
        Some(vec!["id".to_string()])
    );
    assert_eq!(
        secure_inbound_query_fields("Employee", ["id", "ownProp"], &group),
        Some(vec!["id".to_string()])
    );
}

#[tokio::test]
async fn test_wrapper_rejects_inbound() {
    let ctx = RequestContext::new(dummy_only_group(), Viewer::new("id1").dummy(true));
    let info = ResolveInfo::new("Employee", "ownProp").with_return_type("String");

    let value = run(resolver_fn(|_, _, _, _| Resolved::ready("test")), &ctx, &info).await;
    assert_eq!(value, Value::Null);
}

#[tokio::test]
async fn test_wrapper_passes_unguarded_type() {
    let ctx = RequestContext::new(dummy_only_group(), Viewer::new("id1").dummy(true));
    let info = ResolveInfo::new("Employee", "id").with_return_type("Bloop");

    let value = run(resolver_fn(|_, _, _, _| Resolved::ready("test")), &ctx, &info).await;
    assert_eq!(value, json!("test"));
}

#[tokio::test]
async fn test_wrapper_single() {
    let ctx = RequestContext::new(sec_group(), Viewer::new("id1"));
    let info = ResolveInfo::new("Query", "employee").with_return_type("Employee");
    let expected = json!({ "id": "id", "email": "email" });

    let ready = resolver_fn(|_, _, _, _| {
        Resolved::ready(json!({ "id": "id", "first_name": "first_name", "email": "email" }))
    });
    assert_eq!(run(ready, &ctx, &info).await, expected);

    let deferred = resolver_fn(|_, _, _, _| {
        Resolved::deferred_value(async {
            Ok(json!({ "id": "id", "first_name": "first_name", "email": "email" }))
        })
    });
    assert_eq!(run(deferred, &ctx, &info).await, expected);
}

#[tokio::test]
async fn test_wrapper_many() {
    let ctx = RequestContext::new(dummy_only_group(), Viewer::new("id1").dummy(true));
    let info = ResolveInfo::new("Query", "employees").with_return_type("[Employee]");
    let expected = json!([
        { "id": "id1", "first_name": "first_name", "email": "email" },
        { "id": "id2", "email": "email2" }
    ]);

    let ready = resolver_fn(|_, _, _, _| Resolved::ready(employees()));
    assert_eq!(run(ready, &ctx, &info).await, expected);

    let deferred_elements = resolver_fn(|_, _, _, _| {
        let items = match employees() {
            Value::Array(items) => items,
            _ => unreachable!(),
        };
        Resolved::list(
            items
                .into_iter()
                .map(|item| Resolved::deferred_value(async move { Ok(item) })),
        )
    });
    assert_eq!(run(deferred_elements, &ctx, &info).await, expected);
}

#[tokio::test]
async fn test_wrapper_many_without_row_permission() {
    let ctx = RequestContext::new(dummy_only_group(), Viewer::new("id1").dummy(false));
    let info = ResolveInfo::new("Query", "employees").with_return_type("[Employee!]!");

    let value = run(resolver_fn(|_, _, _, _| Resolved::ready(employees())), &ctx, &info).await;
    assert_eq!(value, json!([]));
}

#[tokio::test]
async fn test_deferred_relation_filters_rows() {
    let active_only = SecurityGroup::new("active").with_entity(
        "Employee",
        EntityRules::new().with_row(RuleSet::new().with("any", false).with("active", true)),
    );
    let group = merge_security_groups(&[&sec_group(), &active_only]);
    let ctx = RequestContext::new(group, Viewer::new("id1"));
    let info = ResolveInfo::new("Query", "employees").with_return_type("[Employee]");

    let base = resolver_fn(|_, _, _, _| {
        Resolved::ready(json!([
            { "id": "id1", "suspended": true },
            { "id": "id2", "suspended": false }
        ]))
    });
    assert_eq!(run(base, &ctx, &info).await, json!([{ "id": "id2" }]));
}

#[tokio::test]
async fn test_missing_relation_hook() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let relations = Arc::new(relations().with_missing_relation_hook(Arc::new(
        move |missing: &MissingRelation| {
            sink.lock()
                .unwrap()
                .push((missing.entity.clone(), missing.relation.clone()));
        },
    )));

    let managers = SecurityGroup::new("managers").with_entity(
        "Employee",
        EntityRules::new().with_row(RuleSet::new().with("any", false).with("manager", true)),
    );
    let ctx = RequestContext::new(merge_security_groups(&[&sec_group(), &managers]), Viewer::new("id1"));
    let info = ResolveInfo::new("Query", "employee").with_return_type("Employee");

    let base = resolver_fn(|_, _, _, _| Resolved::ready(json!({ "id": "id1" })));
    let wrapped = resolver_wrapper(base, relations);
    let value = wrapped(&Value::Null, &Value::Null, &ctx, &info)
        .settle()
        .await
        .unwrap();

    assert_eq!(value, Value::Null);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![("Employee".to_string(), "manager".to_string())]
    );
}

#[tokio::test]
async fn test_wrap_resolvers() {
    let mut query: IndexMap<String, Resolver<Viewer>> = IndexMap::new();
    query.insert(
        "employee".to_string(),
        resolver_fn(|_, _, _, _| Resolved::ready(json!({ "id": "id1", "ownProp": "x" }))),
    );
    query.insert(
        "project".to_string(),
        resolver_fn(|_, _, _, _| Resolved::ready(json!({ "id": "p1" }))),
    );
    let mut resolvers: ResolverMap<Viewer> = IndexMap::new();
    resolvers.insert("Query".to_string(), query);

    let wrapped = wrap_resolvers(&resolvers, Arc::new(relations()));
    assert_eq!(wrapped.keys().collect::<Vec<_>>(), vec!["Query"]);
    assert_eq!(
        wrapped["Query"].keys().collect::<Vec<_>>(),
        vec!["employee", "project"]
    );

    let ctx = RequestContext::new(sec_group(), Viewer::new("id1"));
    let employee = ResolveInfo::new("Query", "employee").with_return_type("Employee");
    let value = wrapped["Query"]["employee"](&Value::Null, &Value::Null, &ctx, &employee)
        .settle()
        .await
        .unwrap();
    assert_eq!(value, json!({ "id": "id1" }));

    // Query.project is denied by the default group.
    let project = ResolveInfo::new("Query", "project").with_return_type("Project");
    let value = wrapped["Query"]["project"](&Value::Null, &Value::Null, &ctx, &project)
        .settle()
        .await
        .unwrap();
    assert_eq!(value, Value::Null);
}

#[test]
fn test_group_cache_with_default_ruleset() {
    let cache = GroupCache::new();
    let base = default_ruleset(&catalog());
    let group = test_group();

    let merged = cache.get_or_merge(&[&base, &group]);
    assert_eq!(*merged, sec_group());
    assert!(Arc::ptr_eq(&merged, &cache.get_or_merge(&[&base, &group])));
}

#[test]
fn test_verify_schema_and_resolvers() {
    let catalog = SchemaCatalog::default()
        .with_relations("User", None, [EnumValueDef::new("any")])
        .with_relations(
            "Query",
            None,
            [EnumValueDef::new("noResolver1"), EnumValueDef::new("any")],
        )
        .with_relations(
            "Query",
            Some("nonExistingField"),
            [EnumValueDef::new("any"), EnumValueDef::new("noResolver2")],
        )
        .with_relations("NonExisting", None, [EnumValueDef::new("any")])
        .with_type(TypeDef::object("User", ["id", "name"]))
        .with_type(TypeDef::object("Post", ["id", "name"]))
        .with_type(TypeDef::object("Query", ["me", "post"]));

    let mut resolvers: IndexMap<String, Vec<String>> = IndexMap::new();
    resolvers.insert("Query".into(), vec!["any".into(), "invalidRelation".into()]);
    resolvers.insert("Post".into(), vec!["any".into()]);
    resolvers.insert("NoType".into(), vec!["any".into()]);

    let findings = verify_schema_and_resolvers(&catalog, &resolvers);
    let summary: Vec<_> = findings
        .iter()
        .map(|d| (d.error, d.type_name.as_str(), d.field.as_deref()))
        .collect();

    assert_eq!(
        summary,
        vec![
            (DiagnosticKind::MissingPermissionResolver, "User", None),
            (DiagnosticKind::MissingRelationEnum, "Post", None),
            (DiagnosticKind::InvalidEnumField, "Query", Some("nonExistingField")),
            (DiagnosticKind::InvalidRelationEnum, "NonExisting", None),
            (DiagnosticKind::InvalidPermissionResolver, "NoType", None),
            (DiagnosticKind::InvalidPermissionResolverValue, "Query", Some("invalidRelation")),
            (DiagnosticKind::MissingPermissionResolverValue, "Query", Some("noResolver2")),
            (DiagnosticKind::MissingPermissionResolverValue, "Query", Some("noResolver1")),
        ]
    );
    assert_eq!(
        findings[2].message,
        "_PermissionRelations_Query_nonExistingField enum references a nonexisting field: Query.nonExistingField"
    );
    assert_eq!(findings.iter().filter(|d| d.is_error()).count(), 4);
}
