//! # Document Store
//!
//! Port for the remote project collection. The pipeline only needs three
//! writes (create, partial update, log append); `get`/`list` exist for the
//! presentation layer's reloads. Live updates reach the UI through the run
//! channels, not through store subscriptions.
//!
//! The store is strictly a best-effort mirror of locally-authoritative
//! state: callers in the pipeline swallow every error here after logging it
//! to the developer channel.

use async_trait::async_trait;

use crate::project::{LogEntry, Project, ProjectPatch};

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

/// Failure modes of a store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("document {0} not found")]
    NotFound(String),

    #[error("store rejected write: {0}")]
    Rejected(String),
}

/// Remote project collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new project record, returning its store-assigned id.
    async fn create(&self, project: &Project) -> Result<String, StoreError>;

    /// Apply a partial update to an existing record.
    async fn update(&self, id: &str, patch: &ProjectPatch) -> Result<(), StoreError>;

    /// Append one entry to a record's log array.
    async fn append_log(&self, id: &str, entry: &LogEntry) -> Result<(), StoreError>;

    /// Fetch one record.
    async fn get(&self, id: &str) -> Result<Project, StoreError>;

    /// Fetch an owner's records, newest first.
    async fn list(&self, owner_id: &str, limit: usize) -> Result<Vec<Project>, StoreError>;
}
