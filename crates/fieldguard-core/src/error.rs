//! Core error types.
//!
//! Authorization denial is not represented here: a denied row is `None`,
//! a denied list element is dropped and a denied field is removed. These
//! errors cover genuine faults only.

use thiserror::Error;

/// Errors raised while loading catalogues or security groups.
#[derive(Debug, Error)]
pub enum Error {
    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The catalogue document did not have a recognised shape.
    #[error("invalid catalogue: {0}")]
    InvalidCatalog(String),
}

/// Result type for loading operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Faults raised by base resolvers or relation predicates.
///
/// The middleware never creates these for permission decisions; they are
/// passed through to the caller unchanged.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The base resolver failed.
    #[error("resolver failed: {0}")]
    Resolver(String),

    /// A relation predicate failed.
    #[error("relation {entity}.{relation} failed: {message}")]
    Relation {
        /// Entity type the predicate belongs to.
        entity: String,
        /// Relation name.
        relation: String,
        /// Failure description.
        message: String,
    },

    /// A resolver returned a value whose shape does not match its return type.
    #[error("unexpected shape for {type_name}: expected {expected}")]
    UnexpectedShape {
        /// Declared return type name.
        type_name: String,
        /// What was expected ("object" or "list").
        expected: &'static str,
    },

    /// Any other error raised by integrator code.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ResolveError {
    /// Create a resolver error from a message.
    pub fn resolver(message: impl Into<String>) -> Self {
        ResolveError::Resolver(message.into())
    }

    /// Create a relation predicate error.
    pub fn relation(
        entity: impl Into<String>,
        relation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ResolveError::Relation {
            entity: entity.into(),
            relation: relation.into(),
            message: message.into(),
        }
    }
}

/// Result type for resolver and predicate evaluation.
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResolveError::relation("Employee", "own", "viewer missing id");
        assert_eq!(
            err.to_string(),
            "relation Employee.own failed: viewer missing id"
        );

        let err = ResolveError::UnexpectedShape {
            type_name: "Employee".to_string(),
            expected: "list",
        };
        assert!(err.to_string().contains("expected list"));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: Error = parse.unwrap_err().into();
        assert!(err.to_string().starts_with("json error"));
    }
}
