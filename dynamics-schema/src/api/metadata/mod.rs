//! Dynamics 365 metadata snapshot
//!
//! Read-only view of the schema objects that already exist in an environment.

pub mod models;

pub use models::{
    AttributeMetadata, EntityMetadata, KeyMetadata, RelationshipMetadata, RelationshipType,
    SchemaSnapshot, parse_entity_definitions,
};
