//! Storage backends
//!
//! A backend loads and persists whole collections. It knows nothing about
//! keys or documents; `DocumentStore` owns those semantics and the locking.

use crate::error::{AppError, AppResult};
use crate::store::{Collection, CollectionMap};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Durable home of the collections
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Load a full collection. Missing or malformed data is an error here;
    /// the store decides how to recover.
    async fn load(&self, collection: Collection) -> AppResult<CollectionMap>;

    /// Replace the full collection
    async fn persist(&self, collection: Collection, data: &CollectionMap) -> AppResult<()>;

    /// Create an empty collection if none exists yet
    async fn initialize(&self, collection: Collection) -> AppResult<()>;

    /// Human readable location, for logs
    fn describe(&self) -> String;
}

/// One JSON file per collection inside a data directory
pub struct JsonFileBackend {
    data_dir: PathBuf,
    pretty: bool,
}

impl JsonFileBackend {
    pub fn new(data_dir: impl Into<PathBuf>, pretty: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            pretty,
        }
    }

    pub fn path_for(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(collection.file_name())
    }

    fn encode(&self, data: &CollectionMap) -> AppResult<Vec<u8>> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(data)?
        } else {
            serde_json::to_vec(data)?
        };
        Ok(bytes)
    }
}

#[async_trait]
impl StorageBackend for JsonFileBackend {
    async fn load(&self, collection: Collection) -> AppResult<CollectionMap> {
        let path = self.path_for(collection);
        let raw = tokio::fs::read_to_string(&path).await?;

        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(map),
            other => Err(AppError::Storage(format!(
                "{} does not hold a JSON object (found {})",
                path.display(),
                json_kind(&other)
            ))),
        }
    }

    async fn persist(&self, collection: Collection, data: &CollectionMap) -> AppResult<()> {
        let path = self.path_for(collection);
        let tmp_path = self
            .data_dir
            .join(format!(".{}.{}.tmp", collection.file_name(), Uuid::new_v4()));
        let bytes = self.encode(data)?;

        let write_result = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp_path, &path).await
        }
        .await;

        if let Err(e) = write_result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!("Persisted {} ({} documents) to {}", collection, data.len(), path.display());
        Ok(())
    }

    async fn initialize(&self, collection: Collection) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;

        let path = self.path_for(collection);
        if tokio::fs::try_exists(&path).await? {
            return Ok(());
        }

        tokio::fs::write(&path, b"{}").await?;
        info!("Initialized empty collection file {}", path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json files in {}", self.data_dir.display())
    }
}

/// Process-local backend for tests and throwaway runs
#[derive(Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<Collection, CollectionMap>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn load(&self, collection: Collection) -> AppResult<CollectionMap> {
        let collections = self.collections.read().await;
        collections
            .get(&collection)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Collection {} not initialized", collection)))
    }

    async fn persist(&self, collection: Collection, data: &CollectionMap) -> AppResult<()> {
        let mut collections = self.collections.write().await;
        collections.insert(collection, data.clone());
        Ok(())
    }

    async fn initialize(&self, collection: Collection) -> AppResult<()> {
        let mut collections = self.collections.write().await;
        collections.entry(collection).or_default();
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
