//! Memoization of merged security groups.

use super::group::{merge_security_groups, SecurityGroup};
use dashmap::DashMap;
use std::sync::Arc;

/// Concurrent cache of merged groups.
///
/// Entries are keyed by the ordered list of input group names rather than
/// the merged name, because merging is not commutative on conflicting keys.
#[derive(Debug, Default)]
pub struct GroupCache {
    entries: DashMap<Vec<String>, Arc<SecurityGroup>>,
}

impl GroupCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached merge of `groups`, merging on first use.
    ///
    /// Groups are identified by name only; callers must not reuse a name for
    /// different rule contents.
    pub fn get_or_merge(&self, groups: &[&SecurityGroup]) -> Arc<SecurityGroup> {
        let key: Vec<String> = groups.iter().map(|group| group.name.clone()).collect();
        if let Some(hit) = self.entries.get(&key) {
            return Arc::clone(hit.value());
        }
        let merged = Arc::new(merge_security_groups(groups));
        tracing::debug!(group = %merged.name, "caching merged security group");
        Arc::clone(self.entries.entry(key).or_insert(merged).value())
    }

    /// Number of cached merges.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all cached merges.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{EntityRules, RuleSet};

    #[test]
    fn test_cache_hits_by_order() {
        let cache = GroupCache::new();
        let a = SecurityGroup::new("a").with_entity(
            "Employee",
            EntityRules::new().with_row(RuleSet::new().with("own", true)),
        );
        let b = SecurityGroup::new("b").with_entity(
            "Employee",
            EntityRules::new().with_row(RuleSet::new().with("own", false)),
        );

        let first = cache.get_or_merge(&[&a, &b]);
        let again = cache.get_or_merge(&[&a, &b]);
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(cache.len(), 1);

        // Same merged name, different precedence: cached separately.
        let reversed = cache.get_or_merge(&[&b, &a]);
        assert_eq!(first.name, reversed.name);
        assert_ne!(first.rules, reversed.rules);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
