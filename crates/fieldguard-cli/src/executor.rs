//! Command execution.

use crate::config::AuditConfig;
use fieldguard_core::schema::{
    verify_schema_and_resolvers, Diagnostic, Level, SchemaCatalog, SchemaConventions,
};
use fieldguard_core::{merge_security_groups, SecurityGroup};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from command execution.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Input file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input file is not valid JSON for its purpose.
    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Input file is not an introspection result.
    #[error("{}: {source}", .path.display())]
    Catalog {
        path: PathBuf,
        source: fieldguard_core::Error,
    },

    /// The audit reported findings at or above the failing level.
    #[error("audit failed with {errors} error(s) and {warnings} warning(s)")]
    AuditFailed { errors: usize, warnings: usize },
}

fn read(path: &Path) -> Result<String, ExecuteError> {
    std::fs::read_to_string(path).map_err(|source| ExecuteError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ExecuteError> {
    serde_json::from_str(&read(path)?).map_err(|source| ExecuteError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a schema catalogue from an introspection result.
pub fn load_catalog(
    path: &Path,
    conventions: SchemaConventions,
) -> Result<SchemaCatalog, ExecuteError> {
    let catalog =
        SchemaCatalog::from_introspection_json(&read(path)?).map_err(|source| {
            ExecuteError::Catalog {
                path: path.to_path_buf(),
                source,
            }
        })?;
    tracing::debug!(path = %path.display(), types = catalog.types.len(), "schema loaded");
    Ok(catalog.with_conventions(conventions))
}

/// Load a security group.
pub fn load_group(path: &Path) -> Result<SecurityGroup, ExecuteError> {
    parse_json(path)
}

/// Load a `{"Type": ["relation", ...]}` listing of implemented relations.
pub fn load_resolvers(path: &Path) -> Result<IndexMap<String, Vec<String>>, ExecuteError> {
    parse_json(path)
}

/// Run the audit described by `config`.
pub fn audit(config: &AuditConfig) -> Result<Vec<Diagnostic>, ExecuteError> {
    let catalog = load_catalog(&config.schema_path, config.conventions.clone())?;
    let resolvers = load_resolvers(&config.resolvers_path)?;
    Ok(verify_schema_and_resolvers(&catalog, &resolvers))
}

/// Decide whether audit findings fail the run.
pub fn audit_verdict(findings: &[Diagnostic], fail_level: Level) -> Result<(), ExecuteError> {
    let errors = findings.iter().filter(|d| d.level == Level::Error).count();
    let warnings = findings.len() - errors;

    if findings.iter().any(|d| d.level >= fail_level) {
        return Err(ExecuteError::AuditFailed { errors, warnings });
    }
    Ok(())
}

/// Merge group files in order, optionally on top of a base group.
pub fn merge_group_files(
    base: Option<SecurityGroup>,
    paths: &[PathBuf],
) -> Result<SecurityGroup, ExecuteError> {
    let mut groups = Vec::with_capacity(paths.len() + 1);
    groups.extend(base);
    for path in paths {
        groups.push(load_group(path)?);
    }

    let refs: Vec<&SecurityGroup> = groups.iter().collect();
    let merged = merge_security_groups(&refs);
    tracing::info!(group = %merged.name, inputs = refs.len(), "groups merged");
    Ok(merged)
}
