//! Relation rule sets.
//!
//! A rule set maps relation names to a three-state rule. Only `Allow` and
//! `Deny` are specified values; `Unset` and absent keys both mean
//! "unspecified" and never override anything during a merge.

use indexmap::IndexMap;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single relation requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rule {
    /// The relation grants access when it holds.
    Allow,
    /// The relation is explicitly not used to grant access.
    Deny,
    /// No opinion; merges leave the previous value untouched.
    #[default]
    Unset,
}

impl Rule {
    /// Combine with an incoming rule. Specified incoming values win.
    pub fn combine(self, incoming: Rule) -> Rule {
        match incoming {
            Rule::Unset => self,
            specified => specified,
        }
    }

    /// Boolean view of a specified rule.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Rule::Allow => Some(true),
            Rule::Deny => Some(false),
            Rule::Unset => None,
        }
    }

    /// Check if this rule is `Allow` or `Deny`.
    pub fn is_specified(self) -> bool {
        !matches!(self, Rule::Unset)
    }

    /// Check if this rule is `Allow`.
    pub fn is_allow(self) -> bool {
        matches!(self, Rule::Allow)
    }
}

impl From<bool> for Rule {
    fn from(value: bool) -> Self {
        if value {
            Rule::Allow
        } else {
            Rule::Deny
        }
    }
}

impl From<Option<bool>> for Rule {
    fn from(value: Option<bool>) -> Self {
        value.map(Rule::from).unwrap_or(Rule::Unset)
    }
}

/// Mapping of relation name to rule, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: IndexMap<String, Rule>,
}

impl RuleSet {
    /// Create an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule (builder style).
    pub fn with(mut self, relation: impl Into<String>, rule: impl Into<Rule>) -> Self {
        self.set(relation, rule);
        self
    }

    /// Set a rule, keeping the key's original position if it already exists.
    pub fn set(&mut self, relation: impl Into<String>, rule: impl Into<Rule>) {
        self.rules.insert(relation.into(), rule.into());
    }

    /// Get the rule for a relation. Absent keys read as `Unset`.
    pub fn get(&self, relation: &str) -> Rule {
        self.rules.get(relation).copied().unwrap_or_default()
    }

    /// Iterate over all entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Rule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Relation names whose rule is `Allow`, in declaration order.
    pub fn granted(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, rule)| rule.is_allow())
            .map(|(relation, _)| relation)
    }

    /// Check if at least one relation is `Allow`.
    pub fn has_true_rule(&self) -> bool {
        self.rules.values().any(|rule| rule.is_allow())
    }

    /// Number of entries, including `Unset` ones.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the rule set has no entries.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Merge another rule set into this one.
    ///
    /// Only specified rules of `other` overwrite; `Unset` entries are ignored.
    pub fn merge(&mut self, other: &RuleSet) {
        for (relation, rule) in other.iter() {
            if rule.is_specified() {
                let current = self.get(relation);
                self.rules.insert(relation.to_string(), current.combine(rule));
            }
        }
    }

    /// Return a new rule set with `other` merged over `self`.
    pub fn merged(&self, other: &RuleSet) -> RuleSet {
        let mut combined = self.clone();
        combined.merge(other);
        combined
    }
}

impl<K: Into<String>, R: Into<Rule>> FromIterator<(K, R)> for RuleSet {
    fn from_iter<I: IntoIterator<Item = (K, R)>>(iter: I) -> Self {
        let mut set = RuleSet::new();
        for (relation, rule) in iter {
            set.set(relation, rule);
        }
        set
    }
}

/// Merge rule sets left to right; later sets win on conflicting keys.
///
/// The empty set is the identity element.
pub fn merge_rule_sets<'a>(sets: impl IntoIterator<Item = &'a RuleSet>) -> RuleSet {
    let mut combined = RuleSet::new();
    for set in sets {
        // Unset entries are dropped so the result only holds specified rules.
        for (relation, rule) in set.iter().filter(|(_, rule)| rule.is_specified()) {
            combined.set(relation, rule);
        }
    }
    combined
}

/// Check if an optional rule set has at least one `Allow` entry.
pub fn has_a_true_rule(rules: Option<&RuleSet>) -> bool {
    rules.is_some_and(RuleSet::has_true_rule)
}

impl Serialize for RuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let specified: Vec<_> = self
            .iter()
            .filter_map(|(relation, rule)| rule.as_bool().map(|b| (relation, b)))
            .collect();
        let mut map = serializer.serialize_map(Some(specified.len()))?;
        for (relation, value) in specified {
            map.serialize_entry(relation, &value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RuleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RuleSetVisitor;

        impl<'de> Visitor<'de> for RuleSetVisitor {
            type Value = RuleSet;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of relation names to booleans")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> Result<RuleSet, M::Error> {
                let mut set = RuleSet::new();
                while let Some((relation, value)) =
                    access.next_entry::<String, serde_json::Value>()?
                {
                    // Anything that is not a boolean is unspecified.
                    set.set(relation, value.as_bool());
                }
                Ok(set)
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<RuleSet, E> {
                Ok(RuleSet::new())
            }
        }

        deserializer.deserialize_any(RuleSetVisitor)
    }
}
