//! # In-Memory Store
//!
//! In-process [`DocumentStore`] used by the server's local mode and by
//! tests. Mirrors the remote store's contract exactly, including
//! store-assigned ids and append-only log ordering.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::project::{LogEntry, Project, ProjectPatch};

use super::{DocumentStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Project>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, project: &Project) -> Result<String, StoreError> {
        let id = format!("p-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut record = project.clone();
        record.id = id.clone();
        self.records.write().await.insert(id.clone(), record);
        Ok(id)
    }

    async fn update(&self, id: &str, patch: &ProjectPatch) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.apply(patch);
        Ok(())
    }

    async fn append_log(&self, id: &str, entry: &LogEntry) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.push_log(entry.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Project, StoreError> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list(&self, owner_id: &str, limit: usize) -> Result<Vec<Project>, StoreError> {
        let records = self.records.read().await;
        let mut projects: Vec<Project> = records
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        projects.truncate(limit);
        Ok(projects)
    }
}
