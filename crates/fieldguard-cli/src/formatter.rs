//! Output formatters for command results.

use clap::ValueEnum;
use comfy_table::{Cell, Color, Table};
use fieldguard_core::schema::{Diagnostic, Level, PermissionDescriptions, PermissionedType};
use fieldguard_core::{Rule, RuleSet, SecurityGroup};
use serde::Serialize;

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format audit findings.
    fn format_diagnostics(&self, diagnostics: &[Diagnostic]) -> String;

    /// Format a security group.
    fn format_group(&self, group: &SecurityGroup) -> String;

    /// Format declared relation descriptions.
    fn format_descriptions(&self, descriptions: &PermissionDescriptions) -> String;

    /// Format types annotated with their field relations.
    fn format_schema(&self, types: &[PermissionedType]) -> String;

    /// Format the outcome of a static field check.
    fn format_field_check(&self, entity: &str, allowed: Option<&[String]>) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_diagnostics(&self, diagnostics: &[Diagnostic]) -> String {
        if diagnostics.is_empty() {
            return "No findings".to_string();
        }

        let mut table = Table::new();
        table.set_header(vec!["Level", "Error", "Type", "Field", "Message"]);

        for diagnostic in diagnostics {
            let color = match diagnostic.level {
                Level::Error => Color::Red,
                Level::Warn => Color::Yellow,
            };
            table.add_row(vec![
                Cell::new(diagnostic.level).fg(color),
                Cell::new(diagnostic.error),
                Cell::new(&diagnostic.type_name),
                Cell::new(diagnostic.field.as_deref().unwrap_or("")),
                Cell::new(&diagnostic.message),
            ]);
        }

        table.to_string()
    }

    fn format_group(&self, group: &SecurityGroup) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Entity", "Scope", "Allow", "Deny"]);

        for (entity, rules) in group.rules.iter().flatten() {
            table.add_row(rule_row(entity, "row", &rules.row));
            for (field, col) in &rules.col {
                table.add_row(rule_row(entity, &format!("col.{}", field), col));
            }
        }

        let name = if group.name.is_empty() {
            "(unnamed)"
        } else {
            group.name.as_str()
        };
        format!("Group: {}\n{}", name, table)
    }

    fn format_descriptions(&self, descriptions: &PermissionDescriptions) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Type", "Field", "Relation", "Description"]);

        for (type_name, declared) in descriptions {
            for (relation, description) in &declared.type_relations {
                table.add_row(vec![
                    type_name.as_str(),
                    "",
                    relation.as_str(),
                    description.as_str(),
                ]);
            }
            for (field, relations) in &declared.fields {
                for (relation, description) in relations {
                    table.add_row(vec![
                        type_name.as_str(),
                        field.as_str(),
                        relation.as_str(),
                        description.as_str(),
                    ]);
                }
            }
        }

        table.to_string()
    }

    fn format_schema(&self, types: &[PermissionedType]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Type", "Field", "Return Type", "Relations"]);

        let annotated = types
            .iter()
            .filter(|t| t.fields.iter().any(|f| !f.permissions.is_empty()));
        for type_def in annotated {
            for field in &type_def.fields {
                let relations: Vec<&str> = field.permissions.keys().map(String::as_str).collect();
                table.add_row(vec![
                    type_def.name.clone(),
                    field.field.name.clone(),
                    field.field.return_type().unwrap_or_default(),
                    relations.join(", "),
                ]);
            }
        }

        table.to_string()
    }

    fn format_field_check(&self, entity: &str, allowed: Option<&[String]>) -> String {
        match allowed {
            None => format!("{}: row denied", entity),
            Some([]) => format!("{}: no requested field is readable", entity),
            Some(fields) => format!("{}: {}", entity, fields.join(", ")),
        }
    }
}

fn rule_row(entity: &str, scope: &str, rules: &RuleSet) -> Vec<String> {
    let with = |wanted: Rule| {
        rules
            .iter()
            .filter(|(_, rule)| *rule == wanted)
            .map(|(relation, _)| relation)
            .collect::<Vec<_>>()
            .join(", ")
    };
    vec![
        entity.to_string(),
        scope.to_string(),
        with(Rule::Allow),
        with(Rule::Deny),
    ]
}

/// JSON formatter.
pub struct JsonFormatter;

impl JsonFormatter {
    fn render<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_diagnostics(&self, diagnostics: &[Diagnostic]) -> String {
        Self::render(diagnostics)
    }

    fn format_group(&self, group: &SecurityGroup) -> String {
        Self::render(group)
    }

    fn format_descriptions(&self, descriptions: &PermissionDescriptions) -> String {
        Self::render(descriptions)
    }

    fn format_schema(&self, types: &[PermissionedType]) -> String {
        Self::render(types)
    }

    fn format_field_check(&self, entity: &str, allowed: Option<&[String]>) -> String {
        Self::render(&serde_json::json!({
            "entity": entity,
            "fields": allowed,
        }))
    }
}
