//! The metadata service seam used by the sync engine

use anyhow::Result;
use async_trait::async_trait;

use super::metadata::SchemaSnapshot;
use super::operations::{Operation, OperationResult};

/// The two capabilities the sync engine needs from an environment
///
/// `execute` returns `Err` for transport failures and an error
/// [`OperationResult`] when the service rejected the request. Both count as
/// a failed object; neither is retried.
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Read every entity with its attributes, keys and relationships
    async fn fetch_snapshot(&self) -> Result<SchemaSnapshot>;

    /// Execute a single creation request
    async fn execute(&self, operation: &Operation) -> Result<OperationResult>;
}
