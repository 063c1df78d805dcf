//! Dynamics 365 metadata models

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Attribute metadata (only what existence checks need)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMetadata {
    pub logical_name: String,
    pub schema_name: Option<String>,
    pub attribute_type: Option<String>,
}

/// Alternate key metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetadata {
    pub logical_name: String,
    pub schema_name: Option<String>,
    pub key_attributes: Vec<String>,
}

/// Relationship types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipType {
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// Relationship metadata, seen from the owning entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipMetadata {
    pub schema_name: String,
    pub relationship_type: RelationshipType,
    /// The other entity in the relationship
    pub related_entity: String,
}

/// Entity metadata as captured in a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub logical_name: String,
    pub schema_name: Option<String>,
    pub attributes: Vec<AttributeMetadata>,
    pub keys: Vec<KeyMetadata>,
    pub relationships: Vec<RelationshipMetadata>,
}

impl EntityMetadata {
    pub fn new(logical_name: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            ..Default::default()
        }
    }

    pub fn has_attribute(&self, logical_name: &str) -> bool {
        self.attributes
            .iter()
            .any(|a| a.logical_name.eq_ignore_ascii_case(logical_name))
    }

    pub fn has_key(&self, logical_name: &str) -> bool {
        self.keys
            .iter()
            .any(|k| k.logical_name.eq_ignore_ascii_case(logical_name))
    }

    /// Whether a relationship of this type and schema name is attached to the entity
    pub fn has_relationship(&self, relationship_type: RelationshipType, schema_name: &str) -> bool {
        self.relationships.iter().any(|r| {
            r.relationship_type == relationship_type && r.schema_name.eq_ignore_ascii_case(schema_name)
        })
    }

    fn matches_schema_name(&self, schema_name: &str) -> bool {
        self.schema_name
            .as_deref()
            .unwrap_or(&self.logical_name)
            .eq_ignore_ascii_case(schema_name)
    }
}

/// One-shot read of every entity in an environment
///
/// Used strictly as a lookup table: it is captured once at the start of a
/// run and never updated as objects get created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    entities: Vec<EntityMetadata>,
}

impl SchemaSnapshot {
    pub fn new(entities: Vec<EntityMetadata>) -> Self {
        Self { entities }
    }

    pub fn entities(&self) -> &[EntityMetadata] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn find_by_logical_name(&self, logical_name: &str) -> Option<&EntityMetadata> {
        self.entities
            .iter()
            .find(|e| e.logical_name.eq_ignore_ascii_case(logical_name))
    }

    pub fn find_by_schema_name(&self, schema_name: &str) -> Option<&EntityMetadata> {
        self.entities.iter().find(|e| e.matches_schema_name(schema_name))
    }
}

// Web API wire shapes for EntityDefinitions with expanded collections

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawEntityDefinition {
    logical_name: String,
    schema_name: Option<String>,
    #[serde(default)]
    attributes: Vec<RawAttribute>,
    #[serde(default)]
    keys: Vec<RawKey>,
    #[serde(default)]
    many_to_one_relationships: Vec<RawOneToMany>,
    #[serde(default)]
    one_to_many_relationships: Vec<RawOneToMany>,
    #[serde(default)]
    many_to_many_relationships: Vec<RawManyToMany>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawAttribute {
    logical_name: String,
    schema_name: Option<String>,
    attribute_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawKey {
    logical_name: String,
    schema_name: Option<String>,
    #[serde(default)]
    key_attributes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawOneToMany {
    schema_name: String,
    #[serde(default)]
    referenced_entity: String,
    #[serde(default)]
    referencing_entity: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawManyToMany {
    schema_name: String,
    #[serde(default)]
    entity1_logical_name: String,
    #[serde(default)]
    entity2_logical_name: String,
}

impl From<RawEntityDefinition> for EntityMetadata {
    fn from(raw: RawEntityDefinition) -> Self {
        let own_name = raw.logical_name.clone();

        let mut relationships = Vec::new();
        relationships.extend(raw.many_to_one_relationships.into_iter().map(|r| {
            RelationshipMetadata {
                schema_name: r.schema_name,
                relationship_type: RelationshipType::ManyToOne,
                related_entity: r.referenced_entity,
            }
        }));
        relationships.extend(raw.one_to_many_relationships.into_iter().map(|r| {
            RelationshipMetadata {
                schema_name: r.schema_name,
                relationship_type: RelationshipType::OneToMany,
                related_entity: r.referencing_entity,
            }
        }));
        relationships.extend(raw.many_to_many_relationships.into_iter().map(|r| {
            let related_entity = if r.entity1_logical_name.eq_ignore_ascii_case(&own_name) {
                r.entity2_logical_name
            } else {
                r.entity1_logical_name
            };
            RelationshipMetadata {
                schema_name: r.schema_name,
                relationship_type: RelationshipType::ManyToMany,
                related_entity,
            }
        }));

        Self {
            logical_name: raw.logical_name,
            schema_name: raw.schema_name,
            attributes: raw
                .attributes
                .into_iter()
                .map(|a| AttributeMetadata {
                    logical_name: a.logical_name,
                    schema_name: a.schema_name,
                    attribute_type: a.attribute_type,
                })
                .collect(),
            keys: raw
                .keys
                .into_iter()
                .map(|k| KeyMetadata {
                    logical_name: k.logical_name,
                    schema_name: k.schema_name,
                    key_attributes: k.key_attributes,
                })
                .collect(),
            relationships,
        }
    }
}

/// Parse an `EntityDefinitions` response (`{"value": [...]}`) into a snapshot
pub fn parse_entity_definitions(response: &Value) -> Result<SchemaSnapshot> {
    let value = response
        .get("value")
        .cloned()
        .context("EntityDefinitions response has no 'value' array")?;

    let raw: Vec<RawEntityDefinition> =
        serde_json::from_value(value).context("Failed to parse EntityDefinitions response")?;

    Ok(SchemaSnapshot::new(raw.into_iter().map(EntityMetadata::from).collect()))
}
