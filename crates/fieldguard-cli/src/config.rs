//! CLI configuration.

use fieldguard_core::schema::{Level, SchemaConventions};
use std::path::PathBuf;

/// Configuration of an audit run.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Introspection result to audit.
    pub schema_path: PathBuf,

    /// JSON listing of implemented relations: `{"Type": ["relation", ...]}`.
    pub resolvers_path: PathBuf,

    /// Conventions used to read relation declarations.
    pub conventions: SchemaConventions,

    /// Lowest finding level that fails the run.
    pub fail_level: Level,
}

impl AuditConfig {
    /// Create an audit configuration failing on error-level findings.
    pub fn new(schema_path: impl Into<PathBuf>, resolvers_path: impl Into<PathBuf>) -> Self {
        Self {
            schema_path: schema_path.into(),
            resolvers_path: resolvers_path.into(),
            conventions: SchemaConventions::default(),
            fail_level: Level::Error,
        }
    }

    /// Set the schema conventions.
    pub fn with_conventions(mut self, conventions: SchemaConventions) -> Self {
        self.conventions = conventions;
        self
    }

    /// Fail on warnings too.
    pub fn with_deny_warnings(mut self, deny: bool) -> Self {
        self.fail_level = if deny { Level::Warn } else { Level::Error };
        self
    }
}

/// Build conventions from optional command-line overrides.
pub fn conventions_from_overrides(
    relation_prefix: Option<&str>,
    hidden_prefix: Option<&str>,
    id_field: Option<&str>,
) -> SchemaConventions {
    let mut conventions = SchemaConventions::default();
    if let Some(prefix) = relation_prefix {
        conventions = conventions.with_relation_enum_prefix(prefix);
    }
    if let Some(prefix) = hidden_prefix {
        conventions = conventions.with_hidden_prefix(prefix);
    }
    if let Some(field) = id_field {
        conventions = conventions.with_id_field(field);
    }
    conventions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_config_defaults() {
        let config = AuditConfig::new("schema.json", "resolvers.json");
        assert_eq!(config.fail_level, Level::Error);
        assert_eq!(config.conventions, SchemaConventions::default());

        let strict = config.with_deny_warnings(true);
        assert_eq!(strict.fail_level, Level::Warn);
    }

    #[test]
    fn test_convention_overrides() {
        let conventions = conventions_from_overrides(Some("Rel_"), None, Some("uuid"));
        assert_eq!(conventions.relation_enum_prefix, "Rel_");
        assert_eq!(conventions.hidden_prefix, "_");
        assert_eq!(conventions.id_field, "uuid");
    }
}
