//! Type catalogue read from a schema introspection result.

use super::conventions::SchemaConventions;
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of a schema type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
}

/// Reference to a type, possibly wrapped in list and non-null markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub of_type: Option<Box<TypeRef>>,
}

impl TypeRef {
    /// Reference a named type.
    pub fn named(kind: TypeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
            of_type: None,
        }
    }

    /// Wrap in a list.
    pub fn list(inner: TypeRef) -> Self {
        Self {
            kind: TypeKind::List,
            name: None,
            of_type: Some(Box::new(inner)),
        }
    }

    /// Wrap in a non-null marker.
    pub fn non_null(inner: TypeRef) -> Self {
        Self {
            kind: TypeKind::NonNull,
            name: None,
            of_type: Some(Box::new(inner)),
        }
    }
}

/// Renders the reference as `Name`, `Name!`, `[Name]` or `[Name!]!`.
impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.of_type.as_deref()) {
            (TypeKind::NonNull, Some(inner)) => write!(f, "{inner}!"),
            (TypeKind::List, Some(inner)) => write!(f, "[{inner}]"),
            _ => f.write_str(self.name.as_deref().unwrap_or_default()),
        }
    }
}

/// A field of an object type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<TypeRef>,
}

impl FieldDef {
    /// Create a field without type information.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            type_ref: None,
        }
    }

    /// Set the field type.
    pub fn with_type(mut self, type_ref: TypeRef) -> Self {
        self.type_ref = Some(type_ref);
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declared return type as a type reference string, if known.
    pub fn return_type(&self) -> Option<String> {
        self.type_ref.as_ref().map(ToString::to_string)
    }
}

/// A value of an enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValueDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EnumValueDef {
    /// Create an enum value without description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A named schema type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub fields: Vec<FieldDef>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub enum_values: Vec<EnumValueDef>,
}

impl TypeDef {
    /// Create an object type with untyped fields.
    pub fn object<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: TypeKind::Object,
            description: None,
            fields: fields.into_iter().map(FieldDef::new).collect(),
            enum_values: Vec::new(),
        }
    }

    /// Create an enum type.
    pub fn enumeration(name: impl Into<String>, values: impl IntoIterator<Item = EnumValueDef>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Enum,
            description: None,
            fields: Vec::new(),
            enum_values: values.into_iter().collect(),
        }
    }

    /// Append a field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
struct IntrospectionTypes {
    types: Vec<TypeDef>,
}

/// Type catalogue plus the conventions used to read relation declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    pub types: Vec<TypeDef>,
    #[serde(skip)]
    conventions: SchemaConventions,
}

impl SchemaCatalog {
    /// Create a catalogue with default conventions.
    pub fn new(types: impl IntoIterator<Item = TypeDef>) -> Self {
        Self {
            types: types.into_iter().collect(),
            conventions: SchemaConventions::default(),
        }
    }

    /// Parse an introspection result.
    ///
    /// Accepts `{"data": {"__schema": ...}}`, `{"__schema": ...}` and a bare
    /// `{"types": [...]}` object.
    pub fn from_introspection_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_introspection_value(value)
    }

    /// Parse an already decoded introspection result.
    pub fn from_introspection_value(mut value: Value) -> Result<Self> {
        if let Some(data) = value.get_mut("data").map(Value::take) {
            value = data;
        }
        if let Some(schema) = value.get_mut("__schema").map(Value::take) {
            value = schema;
        }
        if value.get("types").is_none() {
            return Err(Error::InvalidCatalog(
                "expected `__schema` or a `types` list".to_string(),
            ));
        }

        let IntrospectionTypes { types } = serde_json::from_value(value)?;
        tracing::debug!(types = types.len(), "catalogue loaded");
        Ok(Self::new(types))
    }

    /// Replace the conventions.
    pub fn with_conventions(mut self, conventions: SchemaConventions) -> Self {
        self.conventions = conventions;
        self
    }

    /// Append a type.
    pub fn with_type(mut self, type_def: TypeDef) -> Self {
        self.types.push(type_def);
        self
    }

    /// Append a relation declaration enum for a type, or for one of its fields.
    pub fn with_relations(
        self,
        type_name: &str,
        field: Option<&str>,
        relations: impl IntoIterator<Item = EnumValueDef>,
    ) -> Self {
        let name = self.conventions.relation_enum_name(type_name, field);
        self.with_type(TypeDef::enumeration(name, relations))
    }

    /// Conventions in use.
    pub fn conventions(&self) -> &SchemaConventions {
        &self.conventions
    }

    /// Get a type by name.
    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|type_def| type_def.name == name)
    }

    /// Object types subject to permission handling, in catalogue order.
    pub fn object_types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types
            .iter()
            .filter(|type_def| type_def.kind == TypeKind::Object)
            .filter(|type_def| !self.conventions.is_hidden(&type_def.name))
    }

    /// Relation declaration enums with their type and optional field.
    pub fn relation_enums(&self) -> impl Iterator<Item = (&str, Option<&str>, &TypeDef)> {
        self.types
            .iter()
            .filter(|type_def| type_def.kind == TypeKind::Enum)
            .filter_map(|type_def| {
                let (type_name, field) = self.conventions.parse_relation_enum(&type_def.name)?;
                Some((type_name, field, type_def))
            })
    }
}
