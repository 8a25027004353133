//! Row and column permission evaluation for one target entity.
//!
//! The row rule set gates the whole entity; only if it passes is each field
//! present on the target checked against its column rule set. Relation
//! outcomes are cached for the duration of one evaluation, so a relation
//! referenced by the row and by several columns runs at most once and every
//! decision within the evaluation sees the same answer.

use crate::error::ResolveResult;
use crate::relation::{Entity, TypeRelations};
use crate::rules::{EntityRules, RuleSet};
use std::collections::HashMap;

/// Relation outcomes computed during one evaluation.
type RelationCache = HashMap<String, bool>;

/// Check one rule set against the target.
///
/// Succeeds on the first granted relation that holds. A granted relation
/// with no predicate fails the whole check immediately. An absent rule set
/// fails.
async fn resolve_permissions<V>(
    relations: &TypeRelations<V>,
    viewer: &V,
    rules: Option<&RuleSet>,
    target: &Entity,
    cache: &mut RelationCache,
) -> ResolveResult<bool> {
    let Some(rules) = rules else {
        return Ok(false);
    };

    for relation in rules.granted() {
        if let Some(&holds) = cache.get(relation) {
            if holds {
                return Ok(true);
            }
            continue;
        }

        let Some(predicate) = relations.get(relation) else {
            relations.report_missing(relation);
            return Ok(false);
        };

        let holds = predicate(viewer, target).resolve().await?;
        tracing::trace!(entity = relations.entity(), relation, holds, "relation evaluated");
        cache.insert(relation.to_string(), holds);
        if holds {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Apply row and column rules to a target entity.
///
/// Returns `None` when the row is denied. Otherwise returns a shallow copy
/// of the target without the fields whose column check failed; fields are
/// never added.
pub async fn secure_result<V>(
    relations: &TypeRelations<V>,
    viewer: &V,
    rules: &EntityRules,
    target: &Entity,
) -> ResolveResult<Option<Entity>> {
    let mut cache = RelationCache::new();

    if !resolve_permissions(relations, viewer, Some(&rules.row), target, &mut cache).await? {
        tracing::debug!(entity = relations.entity(), "row denied");
        return Ok(None);
    }

    let mut secured = Entity::new();
    for (field, value) in target {
        let allowed =
            resolve_permissions(relations, viewer, rules.column(field), target, &mut cache)
                .await?;
        if allowed {
            secured.insert(field.clone(), value.clone());
        } else {
            tracing::debug!(entity = relations.entity(), field = %field, "field removed");
        }
    }

    Ok(Some(secured))
}
