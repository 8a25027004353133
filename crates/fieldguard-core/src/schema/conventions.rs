//! Naming conventions shared by the schema helpers.

/// Default prefix of relation declaration enums.
pub const DEFAULT_RELATION_ENUM_PREFIX: &str = "_PermissionRelations_";

/// Default prefix of types excluded from permission handling.
pub const DEFAULT_HIDDEN_PREFIX: &str = "_";

/// Default identifier field, readable whenever its row is.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Default catch-all relation.
pub const DEFAULT_ANY_RELATION: &str = "any";

/// Default description of the catch-all relation.
pub const DEFAULT_ANY_DESCRIPTION: &str = "any relation";

/// Schema naming conventions.
///
/// Relations are declared as enums named `<prefix><Type>` for type-level
/// relations and `<prefix><Type>_<field>` for field-level ones; each enum
/// value is a relation name, its description the relation's description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaConventions {
    /// Prefix of relation declaration enums.
    pub relation_enum_prefix: String,
    /// Types whose name starts with this prefix are never guarded.
    pub hidden_prefix: String,
    /// Identifier field name.
    pub id_field: String,
    /// Catch-all relation name.
    pub any_relation: String,
    /// Description used for the catch-all relation.
    pub any_description: String,
}

impl Default for SchemaConventions {
    fn default() -> Self {
        Self {
            relation_enum_prefix: DEFAULT_RELATION_ENUM_PREFIX.to_string(),
            hidden_prefix: DEFAULT_HIDDEN_PREFIX.to_string(),
            id_field: DEFAULT_ID_FIELD.to_string(),
            any_relation: DEFAULT_ANY_RELATION.to_string(),
            any_description: DEFAULT_ANY_DESCRIPTION.to_string(),
        }
    }
}

impl SchemaConventions {
    /// Set the relation enum prefix.
    pub fn with_relation_enum_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.relation_enum_prefix = prefix.into();
        self
    }

    /// Set the hidden type prefix.
    pub fn with_hidden_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.hidden_prefix = prefix.into();
        self
    }

    /// Set the identifier field name.
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Set the catch-all relation and its description.
    pub fn with_any_relation(
        mut self,
        relation: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.any_relation = relation.into();
        self.any_description = description.into();
        self
    }

    /// Check if a type is excluded from permission handling.
    pub fn is_hidden(&self, type_name: &str) -> bool {
        !self.hidden_prefix.is_empty() && type_name.starts_with(&self.hidden_prefix)
    }

    /// Enum name declaring the relations of a type, or of one of its fields.
    pub fn relation_enum_name(&self, type_name: &str, field: Option<&str>) -> String {
        match field {
            Some(field) => format!("{}{}_{}", self.relation_enum_prefix, type_name, field),
            None => format!("{}{}", self.relation_enum_prefix, type_name),
        }
    }

    /// Split a relation enum name into type and optional field.
    ///
    /// The type part ends at the first `_`; the field part keeps any
    /// further underscores. Returns `None` for other enums.
    pub fn parse_relation_enum<'a>(&self, enum_name: &'a str) -> Option<(&'a str, Option<&'a str>)> {
        let rest = enum_name.strip_prefix(self.relation_enum_prefix.as_str())?;
        if rest.is_empty() {
            return None;
        }
        match rest.split_once('_') {
            Some((type_name, field)) if !field.is_empty() => Some((type_name, Some(field))),
            Some((type_name, _)) => Some((type_name, None)),
            None => Some((rest, None)),
        }
    }
}
