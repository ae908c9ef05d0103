// Persistence collaborators for view configurations

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

mod file;

pub use file::JsonFileViewState;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage operation failed: {0}")]
    OperationFailed(String),
}

/// Key/value store holding one JSON document per view.
///
/// Missing keys read as `Ok(None)`.
#[async_trait::async_trait]
pub trait ViewStateBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

// In-memory backend, used for tests and for sessions without durable storage
#[derive(Debug, Clone, Default)]
pub struct InMemoryViewState {
    store: Arc<RwLock<HashMap<String, Value>>>,
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::OperationFailed("view state lock poisoned".to_string())
}

impl InMemoryViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        match self.store.read() {
            Ok(store) => store.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl ViewStateBackend for InMemoryViewState {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let store = self.store.read().map_err(poisoned)?;
        Ok(store.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let mut store = self.store.write().map_err(poisoned)?;
        store.insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut store = self.store.write().map_err(poisoned)?;
        store.remove(key);
        Ok(())
    }
}

// Backend factory
pub struct ViewStateFactory;

impl ViewStateFactory {
    /// File-backed storage when `storage_dir` is configured, in-memory otherwise.
    pub fn create(config: &crate::config::EngineConfig) -> Arc<dyn ViewStateBackend> {
        match &config.storage_dir {
            Some(dir) => {
                tracing::info!(dir = %dir.display(), "using JSON file view state");
                Arc::new(JsonFileViewState::new(dir.clone()))
            }
            None => Arc::new(InMemoryViewState::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn in_memory_round_trip() {
        let backend = InMemoryViewState::new();
        assert!(backend.get("view-config:pedidos").await.unwrap().is_none());

        let doc = json!({ "filters": {}, "sort": { "criteria": [] } });
        backend.set("view-config:pedidos", &doc).await.unwrap();
        assert_eq!(backend.get("view-config:pedidos").await.unwrap(), Some(doc));
        assert_eq!(backend.len(), 1);

        backend.delete("view-config:pedidos").await.unwrap();
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn clones_share_the_same_store() {
        let backend = InMemoryViewState::new();
        let handle = backend.clone();
        handle.set("k", &json!(1)).await.unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some(json!(1)));
    }

    #[test]
    fn poisoned_store_still_reports_its_size() {
        let backend = InMemoryViewState::new();
        {
            let mut store = backend.store.write().unwrap();
            store.insert("k".to_string(), json!(1));
        }
        let handle = backend.clone();
        let _ = std::thread::spawn(move || {
            let _guard = handle.store.write().unwrap();
            panic!("poison the view state lock");
        })
        .join();

        assert!(backend.store.is_poisoned());
        assert_eq!(backend.len(), 1);
        assert!(!backend.is_empty());
    }

    #[tokio::test]
    async fn factory_picks_backend_from_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = crate::config::EngineConfig {
            storage_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let backend = ViewStateFactory::create(&config);
        backend.set("view-config:produccion", &json!({})).await.unwrap();
        assert!(dir.path().join("view-config_3Aproduccion.json").exists());

        let memory = ViewStateFactory::create(&crate::config::EngineConfig::default());
        assert!(memory.get("view-config:produccion").await.unwrap().is_none());
    }
}
