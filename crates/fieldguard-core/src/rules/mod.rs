//! Rule sets and security groups.
//!
//! A typical request merges a schema-derived default-deny group with zero or
//! more named override groups:
//!
//! ```ignore
//! use fieldguard_core::rules::{merge_security_groups, SecurityGroup};
//!
//! let base = fieldguard_core::schema::default_ruleset(&catalog);
//! let staff = SecurityGroup::from_json(&staff_json)?;
//! let effective = merge_security_groups(&[&base, &staff]);
//! ```

pub mod cache;
pub mod group;
pub mod ruleset;

pub use cache::GroupCache;
pub use group::{merge_security_group_names, merge_security_groups, EntityRules, SecurityGroup};
pub use ruleset::{has_a_true_rule, merge_rule_sets, Rule, RuleSet};
