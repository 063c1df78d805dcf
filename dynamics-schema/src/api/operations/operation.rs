//! Core Operation types for Dynamics 365 schema operations

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A single schema creation request that can be executed against Dynamics 365
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    /// Create a new entity together with its primary name attribute
    /// POST /EntityDefinitions
    CreateEntity {
        /// Entity logical name (e.g., "oap_country")
        entity: String,
        /// Entity metadata as JSON
        entity_data: Value,
        /// Optional solution unique name to associate the entity with
        solution_name: Option<String>,
    },

    /// Create a new attribute/column on an entity
    /// POST /EntityDefinitions(LogicalName='{entity}')/Attributes
    CreateAttribute {
        /// Entity logical name
        entity: String,
        /// Attribute metadata as JSON (type-specific payload)
        attribute_data: Value,
        solution_name: Option<String>,
    },

    /// Create an alternate key on an entity
    /// POST /EntityDefinitions(LogicalName='{entity}')/Keys
    CreateKey {
        entity: String,
        key_data: Value,
        solution_name: Option<String>,
    },

    /// Create a lookup column and its one-to-many relationship
    /// POST /RelationshipDefinitions
    CreateOneToMany {
        /// Logical name of the entity receiving the lookup
        referencing_entity: String,
        relationship_data: Value,
        solution_name: Option<String>,
    },
}

/// Result of executing an Operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    /// The operation that was executed
    pub operation: Operation,
    /// Whether the operation succeeded
    pub success: bool,
    /// Response data, if the service returned any
    pub data: Option<Value>,
    /// Error message if operation failed
    pub error: Option<String>,
    /// HTTP status code from the response
    pub status_code: Option<u16>,
    /// Response headers that might be useful (e.g., OData-EntityId)
    pub headers: HashMap<String, String>,
}

impl Operation {
    pub fn create_entity(
        entity: impl Into<String>,
        entity_data: Value,
        solution_name: Option<String>,
    ) -> Self {
        Self::CreateEntity {
            entity: entity.into(),
            entity_data,
            solution_name,
        }
    }

    pub fn create_attribute(
        entity: impl Into<String>,
        attribute_data: Value,
        solution_name: Option<String>,
    ) -> Self {
        Self::CreateAttribute {
            entity: entity.into(),
            attribute_data,
            solution_name,
        }
    }

    pub fn create_key(entity: impl Into<String>, key_data: Value, solution_name: Option<String>) -> Self {
        Self::CreateKey {
            entity: entity.into(),
            key_data,
            solution_name,
        }
    }

    pub fn create_one_to_many(
        referencing_entity: impl Into<String>,
        relationship_data: Value,
        solution_name: Option<String>,
    ) -> Self {
        Self::CreateOneToMany {
            referencing_entity: referencing_entity.into(),
            relationship_data,
            solution_name,
        }
    }

    /// Get the entity name for this operation
    pub fn entity(&self) -> &str {
        match self {
            Self::CreateEntity { entity, .. } => entity,
            Self::CreateAttribute { entity, .. } => entity,
            Self::CreateKey { entity, .. } => entity,
            Self::CreateOneToMany {
                referencing_entity, ..
            } => referencing_entity,
        }
    }

    /// Get the HTTP method for this operation
    pub fn http_method(&self) -> &'static str {
        // Every schema creation is a POST
        "POST"
    }

    /// Web API path, relative to the versioned API root
    pub fn path(&self) -> String {
        match self {
            Self::CreateEntity { .. } => "EntityDefinitions".to_string(),
            Self::CreateAttribute { entity, .. } => {
                format!("EntityDefinitions(LogicalName='{}')/Attributes", entity)
            }
            Self::CreateKey { entity, .. } => {
                format!("EntityDefinitions(LogicalName='{}')/Keys", entity)
            }
            Self::CreateOneToMany { .. } => "RelationshipDefinitions".to_string(),
        }
    }

    /// Request body
    pub fn payload(&self) -> &Value {
        match self {
            Self::CreateEntity { entity_data, .. } => entity_data,
            Self::CreateAttribute { attribute_data, .. } => attribute_data,
            Self::CreateKey { key_data, .. } => key_data,
            Self::CreateOneToMany {
                relationship_data, ..
            } => relationship_data,
        }
    }

    pub fn solution_name(&self) -> Option<&str> {
        match self {
            Self::CreateEntity { solution_name, .. }
            | Self::CreateAttribute { solution_name, .. }
            | Self::CreateKey { solution_name, .. }
            | Self::CreateOneToMany { solution_name, .. } => solution_name.as_deref(),
        }
    }

    /// Schema name of the object this operation creates
    pub fn schema_name(&self) -> Option<&str> {
        self.payload().get("SchemaName").and_then(Value::as_str)
    }

    /// Get the operation type as a string
    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::CreateEntity { .. } => "create_entity",
            Self::CreateAttribute { .. } => "create_attribute",
            Self::CreateKey { .. } => "create_key",
            Self::CreateOneToMany { .. } => "create_one_to_many",
        }
    }
}

impl OperationResult {
    /// Create a new successful result
    pub fn success(operation: Operation, data: Option<Value>) -> Self {
        Self {
            operation,
            success: true,
            data,
            error: None,
            status_code: Some(204),
            headers: HashMap::new(),
        }
    }

    /// Create a new error result
    pub fn error(operation: Operation, error: String, status_code: Option<u16>) -> Self {
        Self {
            operation,
            success: false,
            data: None,
            error: Some(error),
            status_code,
            headers: HashMap::new(),
        }
    }

    /// Check if this result represents a successful operation
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Check if this result represents a failed operation
    pub fn is_error(&self) -> bool {
        !self.success
    }

    /// Describe the failure, including the status code when known
    pub fn error_message(&self) -> String {
        let message = self.error.as_deref().unwrap_or("Unknown error");
        match self.status_code {
            Some(status) => format!("{} (HTTP {})", message, status),
            None => message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paths() {
        let entity = Operation::create_entity("oap_country", json!({}), None);
        assert_eq!(entity.path(), "EntityDefinitions");

        let attribute = Operation::create_attribute("oap_country", json!({}), None);
        assert_eq!(attribute.path(), "EntityDefinitions(LogicalName='oap_country')/Attributes");

        let key = Operation::create_key("oap_country", json!({}), None);
        assert_eq!(key.path(), "EntityDefinitions(LogicalName='oap_country')/Keys");

        let one_to_many = Operation::create_one_to_many("oap_city", json!({}), None);
        assert_eq!(one_to_many.path(), "RelationshipDefinitions");
        assert_eq!(one_to_many.entity(), "oap_city");
        assert_eq!(one_to_many.http_method(), "POST");
    }

    #[test]
    fn test_schema_name_and_solution() {
        let op = Operation::create_attribute(
            "oap_country",
            json!({ "SchemaName": "oap_capital" }),
            Some("OAP".to_string()),
        );
        assert_eq!(op.schema_name(), Some("oap_capital"));
        assert_eq!(op.solution_name(), Some("OAP"));
        assert_eq!(op.operation_type(), "create_attribute");
    }

    #[test]
    fn test_error_message() {
        let op = Operation::create_entity("oap_country", json!({}), None);
        let result = OperationResult::error(op.clone(), "Duplicate name".to_string(), Some(400));
        assert!(result.is_error());
        assert_eq!(result.error_message(), "Duplicate name (HTTP 400)");

        let ok = OperationResult::success(op, None);
        assert!(ok.is_success());
    }
}
