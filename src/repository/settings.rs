//! Per-guild settings collections

use crate::error::AppResult;
use crate::store::{Collection, CollectionMap, Document, DocumentStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Who may open the proposal form in a guild
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPermissionSettings {
    #[serde(default)]
    pub allowed_roles: Vec<String>,
}

/// One guild-keyed settings collection. The payload is not interpreted.
#[derive(Clone)]
pub struct SettingsRepository {
    store: Arc<DocumentStore>,
    collection: Collection,
}

impl SettingsRepository {
    pub fn guild_settings(store: Arc<DocumentStore>) -> Self {
        Self { store, collection: Collection::GuildSettings }
    }

    pub fn check_settings(store: Arc<DocumentStore>) -> Self {
        Self { store, collection: Collection::CheckSettings }
    }

    pub fn review_settings(store: Arc<DocumentStore>) -> Self {
        Self { store, collection: Collection::ReviewSettings }
    }

    pub fn court_settings(store: Arc<DocumentStore>) -> Self {
        Self { store, collection: Collection::CourtSettings }
    }

    pub fn form_permissions(store: Arc<DocumentStore>) -> Self {
        Self { store, collection: Collection::FormPermissions }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub async fn save(&self, guild_id: &str, settings: Document) -> AppResult<Document> {
        self.store.save(self.collection, guild_id, settings).await
    }

    pub async fn get(&self, guild_id: &str) -> Option<Document> {
        self.store.get(self.collection, guild_id).await
    }

    pub async fn get_all(&self) -> CollectionMap {
        self.store.get_all(self.collection).await
    }

    /// Decode a guild's settings into a typed view.
    ///
    /// Documents that do not fit the type are logged and treated as absent.
    pub async fn get_typed<T>(&self, guild_id: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let document = self.get(guild_id).await?;
        match serde_json::from_value(document) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!("Ignoring malformed {} for guild {}: {}", self.collection, guild_id, e);
                None
            }
        }
    }
}
