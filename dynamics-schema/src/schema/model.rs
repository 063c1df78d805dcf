//! Declarative schema description and its JSON loader
//!
//! The input is an array of entity objects:
//!
//! ```json
//! [{
//!   "Name": "Country",
//!   "PrimaryKey": "ISO",
//!   "Members": { "ID": "String", "ISO": "String", "Active": "Boolean" },
//!   "ManyToOne": { "Country_Continent": "Continent" },
//!   "ManyToMany": { "Country_Language": "Language" }
//! }]
//! ```
//!
//! `Members` keeps its input order; the first member becomes the primary
//! (display) field of the entity.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{Map, Value};

/// A declared member: raw field name plus raw type tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub type_tag: String,
}

/// A declared relationship: raw relationship name plus the other entity's raw name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipRef {
    pub name: String,
    pub target: String,
}

/// One entity of the schema description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDefinition {
    pub name: String,
    /// First declared member
    pub primary_field: Member,
    /// Remaining members, in declaration order
    pub fields: Vec<Member>,
    pub primary_key: Option<String>,
    pub many_to_one: Vec<RelationshipRef>,
    pub many_to_many: Vec<RelationshipRef>,
}

impl EntityDefinition {
    /// The alternate key field, if one is set and non-blank
    pub fn key_field(&self) -> Option<&str> {
        self.primary_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    /// All members, primary field first
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        std::iter::once(&self.primary_field).chain(self.fields.iter())
    }
}

/// Error loading a schema description
#[derive(Debug)]
pub enum LoadError {
    /// The text is not well-formed JSON of the expected shape
    InvalidJson(serde_json::Error),
    /// Entity at `index` has no (or a blank) `Name`
    MissingName { index: usize },
    /// Entity has no members
    EmptyMembers { entity: String },
    /// Two entities share a name
    DuplicateName { entity: String },
    /// A mapping value is not a string
    InvalidValue {
        entity: String,
        property: &'static str,
        key: String,
    },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::InvalidJson(err) => write!(f, "invalid schema JSON: {}", err),
            LoadError::MissingName { index } => {
                write!(f, "entity #{} is missing the required 'Name' property", index + 1)
            }
            LoadError::EmptyMembers { entity } => {
                write!(f, "entity '{}' must declare at least one member", entity)
            }
            LoadError::DuplicateName { entity } => {
                write!(f, "entity '{}' is declared more than once", entity)
            }
            LoadError::InvalidValue {
                entity,
                property,
                key,
            } => write!(
                f,
                "entity '{}': {}.{} must be a string",
                entity, property, key
            ),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::InvalidJson(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        LoadError::InvalidJson(err)
    }
}

/// Wire shape of one entity
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawEntity {
    name: Option<String>,
    primary_key: Option<String>,
    members: Option<Map<String, Value>>,
    many_to_one: Option<Map<String, Value>>,
    many_to_many: Option<Map<String, Value>>,
}

/// Parse a schema description
pub fn load(json: &str) -> Result<Vec<EntityDefinition>, LoadError> {
    let raw: Vec<RawEntity> = serde_json::from_str(json)?;

    let mut seen = HashSet::new();
    let mut definitions = Vec::with_capacity(raw.len());

    for (index, entity) in raw.into_iter().enumerate() {
        let definition = convert_entity(index, entity)?;

        if !seen.insert(definition.name.to_lowercase()) {
            return Err(LoadError::DuplicateName {
                entity: definition.name,
            });
        }

        definitions.push(definition);
    }

    log::debug!("Loaded {} entity definitions", definitions.len());
    Ok(definitions)
}

fn convert_entity(index: usize, raw: RawEntity) -> Result<EntityDefinition, LoadError> {
    let name = raw
        .name
        .filter(|name| !name.trim().is_empty())
        .ok_or(LoadError::MissingName { index })?;

    let mut members = string_pairs(&name, "Members", raw.members)?.into_iter();

    let (primary_name, primary_tag) = members
        .next()
        .ok_or_else(|| LoadError::EmptyMembers {
            entity: name.clone(),
        })?;

    let fields = members
        .map(|(name, type_tag)| Member { name, type_tag })
        .collect();

    let many_to_one = string_pairs(&name, "ManyToOne", raw.many_to_one)?
        .into_iter()
        .map(|(name, target)| RelationshipRef { name, target })
        .collect();

    let many_to_many = string_pairs(&name, "ManyToMany", raw.many_to_many)?
        .into_iter()
        .map(|(name, target)| RelationshipRef { name, target })
        .collect();

    Ok(EntityDefinition {
        name,
        primary_field: Member {
            name: primary_name,
            type_tag: primary_tag,
        },
        fields,
        primary_key: raw.primary_key,
        many_to_one,
        many_to_many,
    })
}

fn string_pairs(
    entity: &str,
    property: &'static str,
    map: Option<Map<String, Value>>,
) -> Result<Vec<(String, String)>, LoadError> {
    map.unwrap_or_default()
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(value) => Ok((key, value)),
            _ => Err(LoadError::InvalidValue {
                entity: entity.to_string(),
                property,
                key,
            }),
        })
        .collect()
}
