//! Record storage used by the monitoring engine.
//!
//! Records are schemaless JSON documents grouped into named collections and
//! keyed by id. The engine only lists, reads and updates the `checks`
//! collection; creation and deletion belong to check management.

pub mod file;
#[cfg(test)]
pub mod memory;

pub use file::FileStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Collection holding every registered check.
pub const CHECKS: &str = "checks";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("record {collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },

    #[error("record {collection}/{id} is not valid JSON: {source}")]
    Corrupt {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound { collection: collection.to_string(), id: id.to_string() }
    }

    pub fn already_exists(collection: &str, id: &str) -> Self {
        StoreError::AlreadyExists { collection: collection.to_string(), id: id.to_string() }
    }
}

/// Keyed document store, one namespace per collection
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Ids of every record in the collection. A collection that was never
    /// written to is empty, not an error.
    async fn list(&self, collection: &str) -> Result<Vec<String>, StoreError>;

    /// Raw document for `id`. The content is not validated.
    async fn read(&self, collection: &str, id: &str) -> Result<Value, StoreError>;

    /// Replace an existing document. Fails with `NotFound` if `id` is absent.
    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError>;

    /// Insert a new document. Fails with `AlreadyExists` if `id` is taken.
    async fn create(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError>;

    /// Remove a document. Fails with `NotFound` if `id` is absent.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
