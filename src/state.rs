//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::config::StorageConfig;
use crate::error::AppResult;
use crate::interaction::{CommandRegistry, Dispatcher, Workflows};
use crate::permission::RoleDirectory;
use crate::repository::Repositories;
use crate::store::{DocumentStore, JsonFileBackend, StorageBackend};
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Document store over all collections
    pub store: Arc<DocumentStore>,

    /// Typed access to the collections, for workflows
    pub repositories: Repositories,
}

impl AppState {
    /// Open state over any storage backend
    pub async fn open(backend: Arc<dyn StorageBackend>) -> AppResult<Self> {
        let store = Arc::new(DocumentStore::open(backend).await?);
        let repositories = Repositories::new(store.clone());
        Ok(Self { store, repositories })
    }

    /// Open state over the JSON data directory
    pub async fn open_json(config: &StorageConfig) -> AppResult<Self> {
        let backend = JsonFileBackend::new(config.data_dir.clone(), config.pretty);
        Self::open(Arc::new(backend)).await
    }

    /// Build a dispatcher wired to this state's form permissions
    pub fn dispatcher(
        &self,
        commands: CommandRegistry,
        workflows: Workflows,
        roles: Arc<dyn RoleDirectory>,
    ) -> Dispatcher {
        Dispatcher::new(
            commands,
            workflows,
            self.repositories.form_permissions.clone(),
            roles,
        )
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
