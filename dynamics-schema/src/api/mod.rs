//! Dynamics 365 Web API Module
//!
//! Metadata snapshot models, schema creation operations, and the HTTP client
//! that executes them against an environment.

pub mod client;
pub mod metadata;
pub mod operations;
pub mod service;

pub use client::DynamicsClient;
pub use metadata::{EntityMetadata, RelationshipType, SchemaSnapshot};
pub use operations::{Operation, OperationResult};
pub use service::MetadataService;
