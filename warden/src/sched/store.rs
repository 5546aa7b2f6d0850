//! Storage backends for scheduled tasks.

use super::task::{ScheduledTask, TaskKey};
use crate::error::StoreResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Trait for task storage backends.
///
/// The scheduler depends only on this minimal row-store contract, not on
/// any specific storage engine.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// List all tasks.
    async fn list(&self) -> StoreResult<Vec<ScheduledTask>>;

    /// Get a task by key.
    async fn get(&self, key: &TaskKey) -> StoreResult<Option<ScheduledTask>>;

    /// Insert or replace a task.
    async fn insert(&self, task: &ScheduledTask) -> StoreResult<()>;

    /// Delete a task by key. Deleting a missing key is not an error.
    async fn delete(&self, key: &TaskKey) -> StoreResult<()>;
}

/// In-memory task storage.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: Arc<RwLock<HashMap<TaskKey, ScheduledTask>>>,
}

impl MemoryTaskStore {
    /// Create a new memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list(&self) -> StoreResult<Vec<ScheduledTask>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.values().cloned().collect())
    }

    async fn get(&self, key: &TaskKey) -> StoreResult<Option<ScheduledTask>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(key).cloned())
    }

    async fn insert(&self, task: &ScheduledTask) -> StoreResult<()> {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.key(), task.clone());
        Ok(())
    }

    async fn delete(&self, key: &TaskKey) -> StoreResult<()> {
        let mut tasks = self.tasks.write().await;
        tasks.remove(key);
        Ok(())
    }
}

/// File-backed task storage (JSON, write-through cache).
#[derive(Debug)]
pub struct FileTaskStore {
    path: PathBuf,
    cache: Arc<RwLock<HashMap<TaskKey, ScheduledTask>>>,
}

impl FileTaskStore {
    /// Create a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Load tasks from disk into the cache.
    pub async fn init(&self) -> StoreResult<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let tasks: Vec<ScheduledTask> = serde_json::from_str(&content)?;

        let mut cache = self.cache.write().await;
        cache.clear();
        for task in tasks {
            cache.insert(task.key(), task);
        }
        Ok(())
    }

    async fn persist(&self) -> StoreResult<()> {
        let cache = self.cache.read().await;
        let tasks: Vec<&ScheduledTask> = cache.values().collect();
        let content = serde_json::to_string_pretty(&tasks)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn list(&self) -> StoreResult<Vec<ScheduledTask>> {
        let cache = self.cache.read().await;
        Ok(cache.values().cloned().collect())
    }

    async fn get(&self, key: &TaskKey) -> StoreResult<Option<ScheduledTask>> {
        let cache = self.cache.read().await;
        Ok(cache.get(key).cloned())
    }

    async fn insert(&self, task: &ScheduledTask) -> StoreResult<()> {
        {
            let mut cache = self.cache.write().await;
            cache.insert(task.key(), task.clone());
        }
        self.persist().await
    }

    async fn delete(&self, key: &TaskKey) -> StoreResult<()> {
        {
            let mut cache = self.cache.write().await;
            cache.remove(key);
        }
        self.persist().await
    }
}
