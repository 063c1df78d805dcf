//! In-memory metadata service for executor tests

use std::collections::HashSet;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::api::metadata::{
    AttributeMetadata, EntityMetadata, KeyMetadata, RelationshipMetadata, RelationshipType,
    SchemaSnapshot,
};
use crate::api::operations::{Operation, OperationResult};
use crate::api::service::MetadataService;

/// Applies every successful operation to an in-memory schema and records
/// the order operations arrived in
#[derive(Default)]
pub struct MemoryService {
    entities: Mutex<Vec<EntityMetadata>>,
    executed: Mutex<Vec<Operation>>,
    /// Schema names (lower-cased) whose creation is rejected
    failing: HashSet<String>,
    /// Schema names (lower-cased) whose request never gets a response
    unreachable: HashSet<String>,
    snapshot_fails: bool,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(entities: Vec<EntityMetadata>) -> Self {
        Self {
            entities: Mutex::new(entities),
            ..Default::default()
        }
    }

    pub fn failing(mut self, schema_name: &str) -> Self {
        self.failing.insert(schema_name.to_lowercase());
        self
    }

    pub fn unreachable(mut self, schema_name: &str) -> Self {
        self.unreachable.insert(schema_name.to_lowercase());
        self
    }

    pub fn snapshot_fails(mut self) -> Self {
        self.snapshot_fails = true;
        self
    }

    pub fn executed(&self) -> Vec<Operation> {
        self.executed.lock().unwrap().clone()
    }

    /// `(operation_type, schema_name)` of every request received
    pub fn executed_names(&self) -> Vec<(String, String)> {
        self.executed()
            .iter()
            .map(|op| {
                (
                    op.operation_type().to_string(),
                    op.schema_name().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }

    pub fn snapshot(&self) -> SchemaSnapshot {
        SchemaSnapshot::new(self.entities.lock().unwrap().clone())
    }

    fn apply(&self, operation: &Operation) -> Result<(), String> {
        let mut entities = self.entities.lock().unwrap();
        let payload = operation.payload();
        let name = |v: &Value, field: &str| v.get(field).and_then(Value::as_str).map(str::to_string);

        match operation {
            Operation::CreateEntity { entity, .. } => {
                if entities.iter().any(|e| e.logical_name == *entity) {
                    return Err(format!("Entity '{}' already exists", entity));
                }
                let mut created = EntityMetadata::new(entity.clone());
                created.schema_name = name(payload, "SchemaName");
                if let Some(primary) = payload["Attributes"].get(0) {
                    created.attributes.push(attribute(primary));
                }
                entities.push(created);
            }
            Operation::CreateAttribute { entity, .. } => {
                let target = find(&mut entities, entity)?;
                add_attribute(target, attribute(payload))?;
            }
            Operation::CreateKey { entity, .. } => {
                let target = find(&mut entities, entity)?;
                target.keys.push(KeyMetadata {
                    logical_name: name(payload, "LogicalName").unwrap_or_default(),
                    schema_name: name(payload, "SchemaName"),
                    key_attributes: payload["KeyAttributes"]
                        .as_array()
                        .map(|attrs| {
                            attrs
                                .iter()
                                .filter_map(|a| a.as_str().map(str::to_string))
                                .collect()
                        })
                        .unwrap_or_default(),
                });
            }
            Operation::CreateOneToMany {
                referencing_entity, ..
            } => {
                let schema_name = name(payload, "SchemaName").unwrap_or_default();
                let referenced = name(payload, "ReferencedEntity").unwrap_or_default();
                find(&mut entities, &referenced)?;

                let referencing = find(&mut entities, referencing_entity)?;
                add_attribute(referencing, attribute(&payload["Lookup"]))?;
                referencing.relationships.push(RelationshipMetadata {
                    schema_name: schema_name.clone(),
                    relationship_type: RelationshipType::ManyToOne,
                    related_entity: referenced.clone(),
                });

                let referenced_entity = find(&mut entities, &referenced)?;
                referenced_entity.relationships.push(RelationshipMetadata {
                    schema_name,
                    relationship_type: RelationshipType::OneToMany,
                    related_entity: referencing_entity.clone(),
                });
            }
        }
        Ok(())
    }
}

fn attribute(payload: &Value) -> AttributeMetadata {
    AttributeMetadata {
        logical_name: payload["LogicalName"].as_str().unwrap_or_default().to_string(),
        schema_name: payload["SchemaName"].as_str().map(str::to_string),
        attribute_type: payload["AttributeType"].as_str().map(str::to_string),
    }
}

fn add_attribute(entity: &mut EntityMetadata, attribute: AttributeMetadata) -> Result<(), String> {
    if entity.has_attribute(&attribute.logical_name) {
        return Err(format!(
            "Attribute '{}' already exists on '{}'",
            attribute.logical_name, entity.logical_name
        ));
    }
    entity.attributes.push(attribute);
    Ok(())
}

fn find<'a>(entities: &'a mut [EntityMetadata], logical_name: &str) -> Result<&'a mut EntityMetadata, String> {
    entities
        .iter_mut()
        .find(|e| e.logical_name == logical_name)
        .ok_or_else(|| format!("Entity '{}' does not exist", logical_name))
}

#[async_trait]
impl MetadataService for MemoryService {
    async fn fetch_snapshot(&self) -> Result<SchemaSnapshot> {
        if self.snapshot_fails {
            anyhow::bail!("Entity definitions request failed: 401 Unauthorized");
        }
        Ok(self.snapshot())
    }

    async fn execute(&self, operation: &Operation) -> Result<OperationResult> {
        self.executed.lock().unwrap().push(operation.clone());

        let schema_name = operation.schema_name().unwrap_or_default().to_lowercase();
        if self.unreachable.contains(&schema_name) {
            anyhow::bail!("Failed to send {}: connection reset", operation.operation_type());
        }
        if self.failing.contains(&schema_name) {
            return Ok(OperationResult::error(
                operation.clone(),
                "Simulated failure".to_string(),
                Some(400),
            ));
        }

        match self.apply(operation) {
            Ok(()) => Ok(OperationResult::success(operation.clone(), None)),
            Err(message) => Ok(OperationResult::error(operation.clone(), message, Some(404))),
        }
    }
}
