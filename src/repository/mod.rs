//! Typed access to the document collections
//!
//! Thin repositories over [`DocumentStore`](crate::store::DocumentStore) that
//! know each collection's key field and identifier field.

mod court;
mod messages;
mod settings;
mod whitelist;

pub use court::CourtRepository;
pub use messages::MessageRepository;
pub use settings::{FormPermissionSettings, SettingsRepository};
pub use whitelist::{WhitelistDetails, WhitelistRepository};

use crate::error::{validation_error, AppResult};
use crate::store::{DocumentStore, Fields};
use serde_json::Value;
use std::sync::Arc;

/// All repositories sharing one store
#[derive(Clone)]
pub struct Repositories {
    pub guild_settings: SettingsRepository,
    pub check_settings: SettingsRepository,
    pub review_settings: SettingsRepository,
    pub court_settings: SettingsRepository,
    pub form_permissions: SettingsRepository,
    pub messages: MessageRepository,
    pub court: CourtRepository,
    pub whitelist: WhitelistRepository,
}

impl Repositories {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self {
            guild_settings: SettingsRepository::guild_settings(store.clone()),
            check_settings: SettingsRepository::check_settings(store.clone()),
            review_settings: SettingsRepository::review_settings(store.clone()),
            court_settings: SettingsRepository::court_settings(store.clone()),
            form_permissions: SettingsRepository::form_permissions(store.clone()),
            messages: MessageRepository::new(store.clone()),
            court: CourtRepository::new(store.clone()),
            whitelist: WhitelistRepository::new(store),
        }
    }
}

/// Read the string key a record is stored under
fn record_key(record: &Value, key_field: &str) -> AppResult<String> {
    record
        .get(key_field)
        .and_then(Value::as_str)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .ok_or_else(|| validation_error(format!("Record is missing string field '{}'", key_field)))
}

fn into_fields(record: Value) -> AppResult<Fields> {
    match record {
        Value::Object(map) => Ok(map),
        _ => Err(validation_error("Record must be a JSON object")),
    }
}
