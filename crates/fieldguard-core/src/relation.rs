//! Relation predicates.
//!
//! A relation is a named boolean test between the viewer and a target entity
//! ("is the viewer the owner", "is the target active"). Predicates are
//! grouped per entity type and looked up by name during evaluation.

use crate::error::ResolveResult;
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A resolved entity: field name to value.
pub type Entity = serde_json::Map<String, serde_json::Value>;

/// Outcome of a relation predicate, either ready or deferred.
pub enum RelationCheck {
    /// Already computed.
    Ready(ResolveResult<bool>),
    /// Computed asynchronously.
    Deferred(BoxFuture<'static, ResolveResult<bool>>),
}

impl RelationCheck {
    /// Wrap a future as a deferred check.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = ResolveResult<bool>> + Send + 'static,
    {
        RelationCheck::Deferred(future.boxed())
    }

    /// Check if the outcome still has to be awaited.
    pub fn is_deferred(&self) -> bool {
        matches!(self, RelationCheck::Deferred(_))
    }

    /// Await the outcome.
    pub async fn resolve(self) -> ResolveResult<bool> {
        match self {
            RelationCheck::Ready(result) => result,
            RelationCheck::Deferred(future) => future.await,
        }
    }
}

impl From<bool> for RelationCheck {
    fn from(value: bool) -> Self {
        RelationCheck::Ready(Ok(value))
    }
}

impl From<ResolveResult<bool>> for RelationCheck {
    fn from(result: ResolveResult<bool>) -> Self {
        RelationCheck::Ready(result)
    }
}

impl fmt::Debug for RelationCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationCheck::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            RelationCheck::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A relation predicate: `(viewer, target) -> bool`, possibly deferred.
pub type RelationFn<V> = Arc<dyn Fn(&V, &Entity) -> RelationCheck + Send + Sync>;

/// A rule referenced a relation that has no predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingRelation {
    /// Entity type being evaluated.
    pub entity: String,
    /// Relation name without a predicate.
    pub relation: String,
}

/// Callback invoked for every [`MissingRelation`]. The check still fails closed.
pub type MissingRelationHook = Arc<dyn Fn(&MissingRelation) + Send + Sync>;

/// Relation predicates of one entity type.
pub struct TypeRelations<V> {
    entity: String,
    relations: IndexMap<String, RelationFn<V>>,
    on_missing: Option<MissingRelationHook>,
}

impl<V> TypeRelations<V> {
    /// Create an empty predicate table for an entity type.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            relations: IndexMap::new(),
            on_missing: None,
        }
    }

    /// Add a predicate (builder style).
    pub fn with_relation<F, R>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        V: 'static,
        F: Fn(&V, &Entity) -> R + Send + Sync + 'static,
        R: Into<RelationCheck>,
    {
        self.insert(name, predicate);
        self
    }

    /// Add or replace a predicate.
    pub fn insert<F, R>(&mut self, name: impl Into<String>, predicate: F)
    where
        V: 'static,
        F: Fn(&V, &Entity) -> R + Send + Sync + 'static,
        R: Into<RelationCheck>,
    {
        let predicate: RelationFn<V> =
            Arc::new(move |viewer: &V, target: &Entity| -> RelationCheck {
                predicate(viewer, target).into()
            });
        self.relations.insert(name.into(), predicate);
    }

    /// Entity type name.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Look up a predicate by relation name.
    pub fn get(&self, relation: &str) -> Option<&RelationFn<V>> {
        self.relations.get(relation)
    }

    /// Relation names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    /// Number of predicates.
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Check if no predicate is registered.
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub(crate) fn report_missing(&self, relation: &str) {
        tracing::warn!(
            entity = %self.entity,
            relation,
            "rule references a relation without a predicate, denying"
        );
        if let Some(hook) = &self.on_missing {
            hook(&MissingRelation {
                entity: self.entity.clone(),
                relation: relation.to_string(),
            });
        }
    }
}

impl<V> fmt::Debug for TypeRelations<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRelations")
            .field("entity", &self.entity)
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .field("on_missing", &self.on_missing.is_some())
            .finish()
    }
}

/// Relation predicates for every guarded entity type.
///
/// Configured once at startup and shared read-only afterwards. Entity types
/// without an entry are not filtered by the resolver middleware.
pub struct RelationResolvers<V> {
    types: IndexMap<String, TypeRelations<V>>,
    on_missing: Option<MissingRelationHook>,
}

impl<V> Default for RelationResolvers<V> {
    fn default() -> Self {
        Self {
            types: IndexMap::new(),
            on_missing: None,
        }
    }
}

impl<V> RelationResolvers<V> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicate for `entity.relation` (builder style).
    pub fn relation<F, R>(mut self, entity: &str, name: impl Into<String>, predicate: F) -> Self
    where
        V: 'static,
        F: Fn(&V, &Entity) -> R + Send + Sync + 'static,
        R: Into<RelationCheck>,
    {
        self.entry(entity).insert(name, predicate);
        self
    }

    /// Register a whole predicate table, replacing any table for that type.
    pub fn with_type(mut self, mut relations: TypeRelations<V>) -> Self {
        relations.on_missing = self.on_missing.clone();
        self.types.insert(relations.entity.clone(), relations);
        self
    }

    /// Mark an entity type as guarded without registering predicates.
    ///
    /// Every rule on such a type fails closed.
    pub fn guard(mut self, entity: &str) -> Self {
        self.entry(entity);
        self
    }

    /// Install a hook that observes missing-relation denials.
    pub fn with_missing_relation_hook(mut self, hook: MissingRelationHook) -> Self {
        for relations in self.types.values_mut() {
            relations.on_missing = Some(Arc::clone(&hook));
        }
        self.on_missing = Some(hook);
        self
    }

    /// Predicates for an entity type.
    pub fn get(&self, entity: &str) -> Option<&TypeRelations<V>> {
        self.types.get(entity)
    }

    /// Check if an entity type is guarded.
    pub fn contains_type(&self, entity: &str) -> bool {
        self.types.contains_key(entity)
    }

    /// Guarded entity types in registration order.
    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    fn entry(&mut self, entity: &str) -> &mut TypeRelations<V> {
        let on_missing = self.on_missing.clone();
        self.types
            .entry(entity.to_string())
            .or_insert_with(|| TypeRelations {
                entity: entity.to_string(),
                relations: IndexMap::new(),
                on_missing,
            })
    }
}

impl<V> fmt::Debug for RelationResolvers<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationResolvers")
            .field("types", &self.types.values().collect::<Vec<_>>())
            .finish()
    }
}
