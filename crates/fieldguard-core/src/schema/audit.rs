//! Consistency audit between relation declarations and relation predicates.
//!
//! The audit never fails; every finding is returned as a [`Diagnostic`] and
//! the caller decides which levels break a build.

use super::catalog::SchemaCatalog;
use super::descriptions::permission_descriptions;
use crate::relation::RelationResolvers;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Advisory: something is declared or implemented that nothing uses.
    Warn,
    /// Something that will be denied at runtime because it is missing.
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Warn => f.write_str("warn"),
            Level::Error => f.write_str("error"),
        }
    }
}

/// Kind of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A guardable type has no relation declaration enum.
    MissingRelationEnum,
    /// A field-level relation enum names a field the type does not have.
    InvalidEnumField,
    /// A guardable type has no predicate table.
    MissingPermissionResolver,
    /// A relation enum names a type that is not in the schema.
    InvalidRelationEnum,
    /// A predicate table names a type that is not in the schema.
    InvalidPermissionResolver,
    /// A predicate implements a relation that is never declared.
    InvalidPermissionResolverValue,
    /// A declared relation has no predicate.
    MissingPermissionResolverValue,
}

impl DiagnosticKind {
    /// Severity of this kind of finding.
    pub fn level(self) -> Level {
        match self {
            DiagnosticKind::MissingRelationEnum
            | DiagnosticKind::MissingPermissionResolver
            | DiagnosticKind::MissingPermissionResolverValue => Level::Error,
            DiagnosticKind::InvalidEnumField
            | DiagnosticKind::InvalidRelationEnum
            | DiagnosticKind::InvalidPermissionResolver
            | DiagnosticKind::InvalidPermissionResolverValue => Level::Warn,
        }
    }

    /// Stable identifier, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::MissingRelationEnum => "missing_relation_enum",
            DiagnosticKind::InvalidEnumField => "invalid_enum_field",
            DiagnosticKind::MissingPermissionResolver => "missing_permission_resolver",
            DiagnosticKind::InvalidRelationEnum => "invalid_relation_enum",
            DiagnosticKind::InvalidPermissionResolver => "invalid_permission_resolver",
            DiagnosticKind::InvalidPermissionResolverValue => "invalid_permission_resolver_value",
            DiagnosticKind::MissingPermissionResolverValue => "missing_permission_resolver_value",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub error: DiagnosticKind,
    pub level: Level,
    pub message: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Diagnostic {
    fn new(error: DiagnosticKind, type_name: &str, message: String) -> Self {
        Self {
            error,
            level: error.level(),
            message,
            type_name: type_name.to_string(),
            field: None,
        }
    }

    fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    /// Check if this finding is error-level.
    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.error, self.message)
    }
}

/// Read access to implemented relation predicates, by type.
pub trait RelationIndex {
    /// Types with a predicate table, in registration order.
    fn relation_types(&self) -> Vec<&str>;

    /// Relation names implemented for a type.
    fn relation_names(&self, type_name: &str) -> Vec<&str>;
}

impl<V> RelationIndex for RelationResolvers<V> {
    fn relation_types(&self) -> Vec<&str> {
        self.entity_types().collect()
    }

    fn relation_names(&self, type_name: &str) -> Vec<&str> {
        self.get(type_name)
            .map(|relations| relations.names().collect())
            .unwrap_or_default()
    }
}

/// A plain `type -> [relation]` listing, e.g. loaded from JSON.
impl RelationIndex for IndexMap<String, Vec<String>> {
    fn relation_types(&self) -> Vec<&str> {
        self.keys().map(String::as_str).collect()
    }

    fn relation_names(&self, type_name: &str) -> Vec<&str> {
        self.get(type_name)
            .map(|names| names.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Cross-check relation declarations against implemented predicates.
///
/// Findings are reported per guardable type first (missing or misplaced
/// declarations, missing predicate tables), then for declarations and
/// predicate tables naming unknown types, then per relation for types that
/// have both a declaration and a predicate table.
pub fn verify_schema_and_resolvers<R>(catalog: &SchemaCatalog, resolvers: &R) -> Vec<Diagnostic>
where
    R: RelationIndex + ?Sized,
{
    let prefix = &catalog.conventions().relation_enum_prefix;
    let descriptions = permission_descriptions(catalog);
    let resolver_types: IndexSet<&str> = resolvers.relation_types().into_iter().collect();
    let mut diagnostics = Vec::new();
    let mut matched: Vec<&str> = Vec::new();

    for type_def in catalog.object_types() {
        let type_name = type_def.name.as_str();

        match descriptions.get(type_name) {
            Some(declared) => {
                for field in declared.fields.keys() {
                    if type_def.get_field(field).is_none() {
                        diagnostics.push(
                            Diagnostic::new(
                                DiagnosticKind::InvalidEnumField,
                                type_name,
                                format!(
                                    "{prefix}{type_name}_{field} enum references a nonexisting field: {type_name}.{field}"
                                ),
                            )
                            .with_field(field),
                        );
                    }
                }
            }
            None => diagnostics.push(Diagnostic::new(
                DiagnosticKind::MissingRelationEnum,
                type_name,
                format!("Missing enum {prefix}{type_name}"),
            )),
        }

        if resolver_types.contains(type_name) {
            if descriptions.contains_key(type_name) {
                matched.push(type_name);
            }
        } else {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::MissingPermissionResolver,
                type_name,
                format!("Missing permission resolver {type_name}"),
            ));
        }
    }

    let schema_types: IndexSet<&str> = catalog.object_types().map(|t| t.name.as_str()).collect();

    for type_name in descriptions.keys() {
        if !schema_types.contains(type_name.as_str()) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidRelationEnum,
                type_name,
                format!("Relations enum {prefix}{type_name} not found in schema"),
            ));
        }
    }

    for type_name in &resolver_types {
        if !schema_types.contains(type_name) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::InvalidPermissionResolver,
                type_name,
                format!("Resolver {type_name} references a nonexisting type"),
            ));
        }
    }

    for type_name in resolver_types.iter().filter(|t| matched.contains(*t)) {
        let Some(declared) = descriptions.get(*type_name) else {
            continue;
        };
        let mut undeclared = declared.relation_names();
        let implemented: IndexSet<&str> = resolvers.relation_names(type_name).into_iter().collect();

        for relation in implemented {
            if !undeclared.shift_remove(relation) {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::InvalidPermissionResolverValue,
                        type_name,
                        format!(
                            "Invalid permission relation resolver {type_name}.{relation}: not found in enum {prefix}{type_name}"
                        ),
                    )
                    .with_field(relation),
                );
            }
        }

        for relation in undeclared {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::MissingPermissionResolverValue,
                    type_name,
                    format!(
                        "Resolver {type_name}.{relation} is not defined, but specified in enum {prefix}{type_name}"
                    ),
                )
                .with_field(relation),
            );
        }
    }

    tracing::debug!(
        findings = diagnostics.len(),
        errors = diagnostics.iter().filter(|d| d.is_error()).count(),
        "schema audit finished"
    );
    diagnostics
}
