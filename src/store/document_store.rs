//! Keyed document access over a storage backend
//!
//! Every write loads the whole collection, changes it in memory and persists
//! it again. The cycle runs under a per-collection mutex so concurrent tasks
//! in this process cannot lose each other's writes. Separate processes
//! writing the same data directory are not coordinated.

use crate::error::{AppError, AppResult};
use crate::store::{Collection, CollectionMap, Document, Fields, StorageBackend};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Result of a closure passed to [`DocumentStore::mutate`]
pub enum Mutation<R> {
    /// Nothing changed; the collection is not written back
    Unchanged(R),
    /// The collection changed and must be persisted
    Changed(R),
}

/// Thread-safe document store
pub struct DocumentStore {
    backend: Arc<dyn StorageBackend>,
    locks: HashMap<Collection, Mutex<()>>,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        let locks = Collection::ALL
            .iter()
            .map(|c| (*c, Mutex::new(())))
            .collect();
        Self { backend, locks }
    }

    /// Create the store and make sure every collection exists
    pub async fn open(backend: Arc<dyn StorageBackend>) -> AppResult<Self> {
        for collection in Collection::ALL {
            backend.initialize(collection).await?;
        }
        info!("Document store opened ({})", backend.describe());
        Ok(Self::new(backend))
    }

    /// Get a document by key
    pub async fn get(&self, collection: Collection, key: &str) -> Option<Document> {
        let documents = self.load(collection).await;
        let result = documents.get(key).cloned();
        debug!("Get {} [{}] -> {}", collection, key, if result.is_some() { "hit" } else { "miss" });
        result
    }

    /// Get every document of a collection
    pub async fn get_all(&self, collection: Collection) -> CollectionMap {
        self.load(collection).await
    }

    /// Insert or fully replace a document
    pub async fn save(&self, collection: Collection, key: &str, document: Document) -> AppResult<Document> {
        self.mutate(collection, |documents| {
            documents.insert(key.to_string(), document.clone());
            Mutation::Changed(())
        })
        .await?;

        info!("Saved {} [{}]", collection, key);
        Ok(document)
    }

    /// Overlay `fields` onto an existing document.
    ///
    /// Returns `None` and writes nothing when `key` is unknown or holds null;
    /// update never creates documents.
    pub async fn update(&self, collection: Collection, key: &str, fields: Fields) -> AppResult<Option<Document>> {
        let updated = self
            .mutate(collection, |documents| match documents.get_mut(key) {
                Some(existing) if !existing.is_null() => {
                    let merged = shallow_merge(existing, &fields);
                    *existing = merged.clone();
                    Mutation::Changed(Some(merged))
                }
                _ => Mutation::Unchanged(None),
            })
            .await?;

        match &updated {
            Some(_) => info!("Updated {} [{}] ({} fields)", collection, key, fields.len()),
            None => debug!("Update skipped, {} [{}] does not exist", collection, key),
        }
        Ok(updated)
    }

    /// Delete a document, returning whether it existed
    pub async fn remove(&self, collection: Collection, key: &str) -> AppResult<bool> {
        let removed = self
            .mutate(collection, |documents| match documents.remove(key) {
                Some(_) => Mutation::Changed(true),
                None => Mutation::Unchanged(false),
            })
            .await?;

        if removed {
            info!("Removed {} [{}]", collection, key);
        }
        Ok(removed)
    }

    /// Run a read-modify-write cycle on one collection under its lock.
    ///
    /// Missing or malformed data starts the cycle from an empty collection.
    /// Any other read failure aborts it, so a file that exists but cannot be
    /// read is never overwritten.
    pub async fn mutate<F, R>(&self, collection: Collection, f: F) -> AppResult<R>
    where
        F: FnOnce(&mut CollectionMap) -> Mutation<R>,
    {
        let _guard = self.lock_for(collection).lock().await;

        let mut documents = self.load_for_write(collection).await?;
        match f(&mut documents) {
            Mutation::Unchanged(result) => Ok(result),
            Mutation::Changed(result) => {
                if let Err(e) = self.backend.persist(collection, &documents).await {
                    error!(code = e.code(), "Failed to write {}: {}", collection, e);
                    return Err(e);
                }
                Ok(result)
            }
        }
    }

    /// Load a collection, treating unreadable data as empty
    async fn load(&self, collection: Collection) -> CollectionMap {
        match self.backend.load(collection).await {
            Ok(documents) => documents,
            Err(e) => {
                warn!(code = e.code(), "Failed to read {}, treating as empty: {}", collection, e);
                CollectionMap::new()
            }
        }
    }

    async fn load_for_write(&self, collection: Collection) -> AppResult<CollectionMap> {
        match self.backend.load(collection).await {
            Ok(documents) => Ok(documents),
            Err(e) if is_recoverable(&e) => {
                warn!(code = e.code(), "Failed to read {}, rewriting from empty: {}", collection, e);
                Ok(CollectionMap::new())
            }
            Err(e) => {
                error!(code = e.code(), "Refusing to write {}, read failed: {}", collection, e);
                Err(e)
            }
        }
    }

    fn lock_for(&self, collection: Collection) -> &Mutex<()> {
        // Every collection gets a lock in `new`
        &self.locks[&collection]
    }
}

/// Load failures that mean "no usable data" rather than "data out of reach"
fn is_recoverable(e: &AppError) -> bool {
    match e {
        AppError::Io(io) => io.kind() == std::io::ErrorKind::NotFound,
        AppError::Serialization(_) | AppError::Storage(_) | AppError::NotFound(_) => true,
        _ => false,
    }
}

/// Single-level field overlay.
///
/// Top-level keys of `fields` replace those of `base`, including null values;
/// nested objects are replaced wholesale, never merged. A non-object base is
/// treated as empty.
pub fn shallow_merge(base: &Value, fields: &Fields) -> Value {
    let mut merged = match base {
        Value::Object(map) => map.clone(),
        _ => Fields::new(),
    };
    for (key, value) in fields {
        merged.insert(key.clone(), value.clone());
    }
    Value::Object(merged)
}
