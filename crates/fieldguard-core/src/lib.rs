//! Fieldguard Core - security groups, permission evaluation and resolver middleware.
//!
//! This crate provides attribute-based row and field security for typed
//! entity graphs served through per-field resolvers.

pub mod error;
pub mod evaluator;
pub mod guard;
pub mod relation;
pub mod resolver;
pub mod rules;
pub mod schema;

pub use error::{Error, ResolveError, ResolveResult, Result};
pub use evaluator::secure_result;
pub use guard::{check_inbound_query_field, secure_inbound_query_fields};
pub use relation::{
    Entity, MissingRelation, MissingRelationHook, RelationCheck, RelationFn, RelationResolvers,
    TypeRelations,
};
pub use rules::{
    has_a_true_rule, merge_rule_sets, merge_security_group_names, merge_security_groups,
    EntityRules, GroupCache, Rule, RuleSet, SecurityGroup,
};

// Resolver exports
pub use resolver::{
    parse_return_type, resolver_fn, resolver_wrapper, wrap_resolvers, RequestContext,
    ResolveInfo, Resolved, Resolver, ResolverMap, ReturnType,
};

// Schema exports
pub use schema::{
    default_ruleset, permission_descriptions, schema_with_permissions,
    verify_schema_and_resolvers, Diagnostic, DiagnosticKind, Level, SchemaCatalog,
    SchemaConventions,
};
