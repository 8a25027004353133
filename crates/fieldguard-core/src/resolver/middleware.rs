//! Resolver wrapping.
//!
//! A wrapped resolver has the same signature as the resolver it wraps. It
//! rejects statically unreadable fields before the base resolver runs, then
//! applies row and column rules to whatever the base resolver returns when
//! the declared return type is a guarded entity type.

use super::resolved::Resolved;
use super::return_type::{parse_return_type, ReturnType};
use crate::error::{ResolveError, ResolveResult};
use crate::evaluator::secure_result;
use crate::guard::check_inbound_query_field;
use crate::relation::{Entity, RelationResolvers, TypeRelations};
use crate::rules::{EntityRules, SecurityGroup};
use futures::future::try_join_all;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Per-request context handed to every resolver.
pub struct RequestContext<V> {
    /// Effective (merged) security group for this request.
    pub security_group: Arc<SecurityGroup>,
    /// Opaque principal passed to every relation predicate.
    pub viewer: Arc<V>,
}

impl<V> RequestContext<V> {
    /// Create a request context.
    pub fn new(security_group: impl Into<Arc<SecurityGroup>>, viewer: V) -> Self {
        Self {
            security_group: security_group.into(),
            viewer: Arc::new(viewer),
        }
    }
}

impl<V> Clone for RequestContext<V> {
    fn clone(&self) -> Self {
        Self {
            security_group: Arc::clone(&self.security_group),
            viewer: Arc::clone(&self.viewer),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for RequestContext<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("security_group", &self.security_group.name)
            .field("viewer", &self.viewer)
            .finish()
    }
}

/// Per-invocation metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveInfo {
    /// Type owning the field being resolved.
    pub parent_type: String,
    /// Field being resolved.
    pub field_name: String,
    /// Declared return type reference, e.g. `[Employee!]!`.
    pub return_type: Option<String>,
}

impl ResolveInfo {
    /// Create invocation metadata without a return type.
    pub fn new(parent_type: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            parent_type: parent_type.into(),
            field_name: field_name.into(),
            return_type: None,
        }
    }

    /// Set the declared return type.
    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }
}

/// A field resolver: `(source, args, context, info) -> output`.
pub type Resolver<V> =
    Arc<dyn Fn(&Value, &Value, &RequestContext<V>, &ResolveInfo) -> Resolved + Send + Sync>;

/// Resolvers per type and field.
pub type ResolverMap<V> = IndexMap<String, IndexMap<String, Resolver<V>>>;

/// Turn a closure into a [`Resolver`].
pub fn resolver_fn<V, F>(resolver: F) -> Resolver<V>
where
    V: 'static,
    F: Fn(&Value, &Value, &RequestContext<V>, &ResolveInfo) -> Resolved + Send + Sync + 'static,
{
    Arc::new(resolver)
}

/// Wrap a resolver with inbound and outbound permission checks.
///
/// The base resolver is not invoked when the requested field fails the
/// static check; the wrapped resolver then yields `null`. Otherwise the
/// base output is awaited and, if its return type has relation predicates,
/// filtered through the row and column rules of the request's group.
pub fn resolver_wrapper<V>(base: Resolver<V>, relations: Arc<RelationResolvers<V>>) -> Resolver<V>
where
    V: Send + Sync + 'static,
{
    Arc::new(
        move |source: &Value,
              args: &Value,
              ctx: &RequestContext<V>,
              info: &ResolveInfo|
              -> Resolved {
            if !check_inbound_query_field(&info.parent_type, &info.field_name, &ctx.security_group)
            {
                tracing::debug!(
                    parent_type = %info.parent_type,
                    field = %info.field_name,
                    group = %ctx.security_group.name,
                    "inbound field rejected"
                );
                return Resolved::Ready(Value::Null);
            }

            let output = base(source, args, ctx, info);
            let relations = Arc::clone(&relations);
            let ctx = ctx.clone();
            let return_type = parse_return_type(info.return_type.as_deref());

            Resolved::deferred_value(async move {
                secure_output(output, &relations, &ctx, &return_type).await
            })
        },
    )
}

/// Wrap every resolver of a resolver map, keeping its shape.
pub fn wrap_resolvers<V>(
    resolvers: &ResolverMap<V>,
    relations: Arc<RelationResolvers<V>>,
) -> ResolverMap<V>
where
    V: Send + Sync + 'static,
{
    resolvers
        .iter()
        .map(|(type_name, fields)| {
            let wrapped = fields
                .iter()
                .map(|(field, resolver)| {
                    let wrapped = resolver_wrapper(Arc::clone(resolver), Arc::clone(&relations));
                    (field.clone(), wrapped)
                })
                .collect();
            (type_name.clone(), wrapped)
        })
        .collect()
}

async fn secure_output<V>(
    output: Resolved,
    relations: &RelationResolvers<V>,
    ctx: &RequestContext<V>,
    return_type: &ReturnType,
) -> ResolveResult<Value>
where
    V: Send + Sync,
{
    let output = output.flatten().await?;

    let Some(type_relations) = relations.get(&return_type.name) else {
        return output.settle().await;
    };

    let fallback = EntityRules::default();
    let rules = ctx
        .security_group
        .entity_rules(&return_type.name)
        .unwrap_or(&fallback);

    if !return_type.array {
        let value = output.settle().await?;
        let secured = secure_value(type_relations, &ctx.viewer, rules, value, return_type).await?;
        return Ok(secured.map(Value::Object).unwrap_or(Value::Null));
    }

    let items = match output {
        Resolved::List(items) => items,
        Resolved::Ready(Value::Array(values)) => values.into_iter().map(Resolved::Ready).collect(),
        Resolved::Ready(Value::Null) => return Ok(Value::Null),
        _ => return Err(unexpected_shape(return_type, "list")),
    };

    // Only pay for a join when the collection actually holds deferred elements.
    let values = if items.first().is_some_and(Resolved::is_deferred) {
        try_join_all(items.into_iter().map(Resolved::settle)).await?
    } else {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            values.push(item.settle().await?);
        }
        values
    };

    let total = values.len();
    let mut secured = Vec::with_capacity(total);
    for value in values {
        if let Some(entity) =
            secure_value(type_relations, &ctx.viewer, rules, value, return_type).await?
        {
            secured.push(Value::Object(entity));
        }
    }
    tracing::debug!(
        entity = %return_type.name,
        total,
        visible = secured.len(),
        "list filtered"
    );

    Ok(Value::Array(secured))
}

async fn secure_value<V>(
    relations: &TypeRelations<V>,
    viewer: &V,
    rules: &EntityRules,
    value: Value,
    return_type: &ReturnType,
) -> ResolveResult<Option<Entity>> {
    match value {
        Value::Object(target) => secure_result(relations, viewer, rules, &target).await,
        Value::Null => Ok(None),
        _ => Err(unexpected_shape(return_type, "object")),
    }
}

fn unexpected_shape(return_type: &ReturnType, expected: &'static str) -> ResolveError {
    ResolveError::UnexpectedShape {
        type_name: return_type.name.clone(),
        expected,
    }
}
