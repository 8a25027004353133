//! Schema helpers.
//!
//! Relations are declared in the schema itself, as enums following the
//! naming scheme in [`SchemaConventions`]. From those declarations this
//! module derives relation descriptions, the default-deny security group,
//! and an audit of the declarations against implemented predicates.

pub mod audit;
pub mod catalog;
pub mod conventions;
pub mod descriptions;

pub use audit::{verify_schema_and_resolvers, Diagnostic, DiagnosticKind, Level, RelationIndex};
pub use catalog::{EnumValueDef, FieldDef, SchemaCatalog, TypeDef, TypeKind, TypeRef};
pub use conventions::SchemaConventions;
pub use descriptions::{
    default_ruleset, permission_descriptions, schema_with_permissions, PermissionDescriptions,
    PermissionedField, PermissionedType, RelationDescriptions, TypeDescriptions,
};
