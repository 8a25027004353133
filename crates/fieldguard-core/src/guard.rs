//! Static checks on requested fields.
//!
//! These run before any resolver and never evaluate relations: a field is
//! requestable when the entity's row rules and the field's column rules
//! each grant at least one relation.

use crate::rules::{has_a_true_rule, SecurityGroup};

/// Check whether `entity.field` may be requested at all.
pub fn check_inbound_query_field(entity: &str, field: &str, group: &SecurityGroup) -> bool {
    let Some(rules) = group.entity_rules(entity) else {
        return false;
    };
    rules.row.has_true_rule() && has_a_true_rule(rules.column(field))
}

/// Filter requested fields down to those that may be requested.
///
/// Returns `None` when the entity's row rules grant nothing. Otherwise the
/// allowed fields are returned in input order.
pub fn secure_inbound_query_fields<I, S>(
    entity: &str,
    fields: I,
    group: &SecurityGroup,
) -> Option<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let rules = group.entity_rules(entity)?;
    if !rules.row.has_true_rule() {
        return None;
    }

    Some(
        fields
            .into_iter()
            .filter(|field| has_a_true_rule(rules.column(field.as_ref())))
            .map(|field| field.as_ref().to_string())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{EntityRules, RuleSet};

    fn group() -> SecurityGroup {
        SecurityGroup::new("staff")
            .with_entity(
                "Employee",
                EntityRules::new()
                    .with_row(RuleSet::new().with("any", true))
                    .with_col("id", RuleSet::new().with("any", true))
                    .with_col("ownProp", RuleSet::new().with("own", false))
                    .with_col("email", RuleSet::new().with("any", true).with("own", false)),
            )
            .with_entity(
                "Project",
                EntityRules::new()
                    .with_row(RuleSet::new().with("any", false).with("own", false))
                    .with_col("id", RuleSet::new().with("any", true)),
            )
    }

    #[test]
    fn test_row_gate() {
        let group = group();
        assert!(!check_inbound_query_field("Project", "id", &group));
        assert!(!check_inbound_query_field("Unknown", "id", &group));
        assert_eq!(secure_inbound_query_fields("Project", ["id"], &group), None);
    }

    #[test]
    fn test_single_field() {
        let group = group();
        assert!(check_inbound_query_field("Employee", "id", &group));
        assert!(!check_inbound_query_field("Employee", "ownProp", &group));
        assert!(check_inbound_query_field("Employee", "email", &group));
        assert!(!check_inbound_query_field("Employee", "missing", &group));
    }

    #[test]
    fn test_field_list_keeps_order() {
        let group = group();
        assert_eq!(
            secure_inbound_query_fields("Employee", ["id", "ownProp"], &group),
            Some(vec!["id".to_string()])
        );
        assert_eq!(
            secure_inbound_query_fields("Employee", vec!["email", "ownProp", "id"], &group),
            Some(vec!["email".to_string(), "id".to_string()])
        );
        assert_eq!(
            secure_inbound_query_fields("Employee", Vec::<String>::new(), &group),
            Some(vec![])
        );
    }
}
