//! Security groups: named bundles of row and column rule sets.
//!
//! Essential structure:
//!
//! ```text
//! {
//!     name: "employee",
//!     rules: {
//!         <EntityType>: {
//!             row: <RuleSet>,
//!             col: { <fieldName>: <RuleSet> }
//!         }
//!     }
//! }
//! ```

use super::ruleset::{merge_rule_sets, RuleSet};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Row and column rules for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRules {
    /// Entity-level visibility rules.
    #[serde(default)]
    pub row: RuleSet,
    /// Per-field visibility rules.
    #[serde(default)]
    pub col: IndexMap<String, RuleSet>,
}

impl EntityRules {
    /// Create empty entity rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the row rule set.
    pub fn with_row(mut self, row: RuleSet) -> Self {
        self.row = row;
        self
    }

    /// Set the rule set of one column.
    pub fn with_col(mut self, field: impl Into<String>, rules: RuleSet) -> Self {
        self.col.insert(field.into(), rules);
        self
    }

    /// Get the rule set of a column, if declared.
    pub fn column(&self, field: &str) -> Option<&RuleSet> {
        self.col.get(field)
    }
}

/// A named bundle of per-entity rules.
///
/// Groups are treated as immutable values; merging produces a new group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    /// Group name. Empty names are ignored when naming merged groups.
    #[serde(default)]
    pub name: String,
    /// Rules per entity type. `None` contributes nothing to a merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<IndexMap<String, EntityRules>>,
}

impl SecurityGroup {
    /// Create a group with an empty rule table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Some(IndexMap::new()),
        }
    }

    /// Create a group without a rule table.
    pub fn unruled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: None,
        }
    }

    /// Add the rules of one entity type.
    pub fn with_entity(mut self, entity: impl Into<String>, rules: EntityRules) -> Self {
        self.rules
            .get_or_insert_with(IndexMap::new)
            .insert(entity.into(), rules);
        self
    }

    /// Get the rules of an entity type.
    pub fn entity_rules(&self, entity: &str) -> Option<&EntityRules> {
        self.rules.as_ref().and_then(|rules| rules.get(entity))
    }

    /// Parse a group from JSON.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Merge this group with others. See [`merge_security_groups`].
    pub fn merge_with(&self, others: &[&SecurityGroup]) -> SecurityGroup {
        let mut groups = Vec::with_capacity(others.len() + 1);
        groups.push(self);
        groups.extend_from_slice(others);
        merge_security_groups(&groups)
    }
}

/// Create a reproducible name for a merged group.
///
/// Empty names are dropped, the rest sorted and joined with `_`, lower-cased
/// and prefixed with `__`. The argument order does not matter.
pub fn merge_security_group_names<S: AsRef<str>>(names: &[S]) -> String {
    let mut names: Vec<&str> = names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| !name.is_empty())
        .collect();
    names.sort_unstable();
    format!("__{}", names.join("_").to_lowercase())
}

/// Merge security groups into a new group.
///
/// Rules are merged per entity type in argument order, so later groups
/// override earlier ones per relation key, while the name stays
/// order-independent.
pub fn merge_security_groups(groups: &[&SecurityGroup]) -> SecurityGroup {
    let names: Vec<&str> = groups.iter().map(|group| group.name.as_str()).collect();
    let mut combined: IndexMap<String, EntityRules> = IndexMap::new();

    for rules in groups.iter().filter_map(|group| group.rules.as_ref()) {
        for (entity, next) in rules {
            let acc = combined.entry(entity.clone()).or_default();
            acc.row = merge_rule_sets([&acc.row, &next.row]);

            for (field, col_rules) in &next.col {
                let merged = match acc.col.get(field) {
                    Some(current) => merge_rule_sets([current, col_rules]),
                    None => merge_rule_sets([col_rules]),
                };
                acc.col.insert(field.clone(), merged);
            }
        }
    }

    SecurityGroup {
        name: merge_security_group_names(&names),
        rules: Some(combined),
    }
}
