//! Relation descriptions and the default-deny security group.

use super::catalog::{EnumValueDef, FieldDef, SchemaCatalog, TypeDef, TypeKind};
use crate::rules::{EntityRules, RuleSet, SecurityGroup};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Relation name to description.
pub type RelationDescriptions = IndexMap<String, String>;

/// Declared relations of one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptions {
    /// Type-level relations.
    #[serde(rename = "type", default)]
    pub type_relations: RelationDescriptions,
    /// Field-level relations.
    #[serde(default)]
    pub fields: IndexMap<String, RelationDescriptions>,
}

impl TypeDescriptions {
    /// Every declared relation name: field-level first, then type-level.
    pub fn relation_names(&self) -> IndexSet<&str> {
        self.fields
            .values()
            .flat_map(|relations| relations.keys())
            .chain(self.type_relations.keys())
            .map(String::as_str)
            .collect()
    }
}

/// Declared relations per type.
pub type PermissionDescriptions = IndexMap<String, TypeDescriptions>;

fn describe(values: &[EnumValueDef]) -> RelationDescriptions {
    values
        .iter()
        .map(|value| {
            let description = value.description.clone().unwrap_or_else(|| value.name.clone());
            (value.name.clone(), description)
        })
        .collect()
}

/// Collect the relations declared by the catalogue's relation enums.
///
/// A value without a description is described by its own name.
pub fn permission_descriptions(catalog: &SchemaCatalog) -> PermissionDescriptions {
    let mut descriptions = PermissionDescriptions::new();

    for (type_name, field, enum_def) in catalog.relation_enums() {
        let entry = descriptions.entry(type_name.to_string()).or_default();
        let relations = describe(&enum_def.enum_values);
        match field {
            Some(field) => {
                entry.fields.insert(field.to_string(), relations);
            }
            None => entry.type_relations = relations,
        }
    }

    descriptions
}

/// A field annotated with its effective relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionedField {
    #[serde(flatten)]
    pub field: FieldDef,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub permissions: RelationDescriptions,
}

/// A type whose fields carry their effective relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionedType {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<PermissionedField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<EnumValueDef>,
}

impl PermissionedType {
    fn plain(type_def: &TypeDef) -> Self {
        Self {
            name: type_def.name.clone(),
            kind: type_def.kind,
            description: type_def.description.clone(),
            fields: type_def
                .fields
                .iter()
                .map(|field| PermissionedField {
                    field: field.clone(),
                    permissions: RelationDescriptions::new(),
                })
                .collect(),
            enum_values: type_def.enum_values.clone(),
        }
    }
}

/// Annotate every guardable object type's fields with their relations.
///
/// A field's relations are the catch-all relation, overlaid with the
/// type-level relations, overlaid with the field-level ones. Other types
/// are returned without annotations.
pub fn schema_with_permissions(catalog: &SchemaCatalog) -> Vec<PermissionedType> {
    let conventions = catalog.conventions();
    let descriptions = permission_descriptions(catalog);
    let guarded: IndexSet<&str> = catalog.object_types().map(|t| t.name.as_str()).collect();

    catalog
        .types
        .iter()
        .map(|type_def| {
            let mut annotated = PermissionedType::plain(type_def);
            if !guarded.contains(type_def.name.as_str()) {
                return annotated;
            }

            let declared = descriptions.get(&type_def.name);
            let mut general = RelationDescriptions::new();
            general.insert(
                conventions.any_relation.clone(),
                conventions.any_description.clone(),
            );
            if let Some(declared) = declared {
                general.extend(declared.type_relations.clone());
            }

            for field in &mut annotated.fields {
                let mut permissions = general.clone();
                if let Some(own) = declared.and_then(|d| d.fields.get(&field.field.name)) {
                    permissions.extend(own.clone());
                }
                field.permissions = permissions;
            }
            annotated
        })
        .collect()
}

fn all_denied<'a>(any_relation: &str, relations: impl IntoIterator<Item = &'a String>) -> RuleSet {
    let mut rules = RuleSet::new().with(any_relation, false);
    for relation in relations {
        rules.set(relation.as_str(), false);
    }
    rules
}

/// Derive the baseline group in which every declared relation is denied.
///
/// The group has an empty name so it never shows up in merged names. Each
/// column starts from the row rules plus the field's own relations; the
/// identifier field always grants the catch-all relation.
pub fn default_ruleset(catalog: &SchemaCatalog) -> SecurityGroup {
    let conventions = catalog.conventions();
    let descriptions = permission_descriptions(catalog);
    let mut group = SecurityGroup::new("");

    for type_def in catalog.object_types() {
        let declared = descriptions.get(&type_def.name);
        let row = all_denied(
            &conventions.any_relation,
            declared.into_iter().flat_map(|d| d.type_relations.keys()),
        );

        let mut rules = EntityRules::new().with_row(row.clone());
        for field in type_def.field_names() {
            let own = declared
                .and_then(|d| d.fields.get(field))
                .into_iter()
                .flat_map(|relations| relations.keys());
            let mut col = row.merged(&all_denied(&conventions.any_relation, own));
            if field == conventions.id_field {
                col.set(conventions.any_relation.as_str(), true);
            }
            rules = rules.with_col(field, col);
        }

        group = group.with_entity(type_def.name.clone(), rules);
    }

    group
}
