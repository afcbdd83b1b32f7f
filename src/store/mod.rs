//! Document store - JSON collections persisted one file per collection
//!
//! Every collection is a flat mapping from an opaque string key to a JSON
//! document. Writes re-serialize the whole collection and replace the backing
//! file atomically.

mod backend;
mod document_store;
mod ids;

pub use backend::{JsonFileBackend, MemoryBackend, StorageBackend};
pub use document_store::{shallow_merge, DocumentStore, Mutation};
pub use ids::{next_id_in, numeric_id};

use serde_json::{Map, Value};

/// A stored document. Payloads are opaque to the store.
pub type Document = Value;

/// Field overlay applied by partial updates
pub type Fields = Map<String, Value>;

/// In-memory image of one whole collection
pub type CollectionMap = Map<String, Value>;

/// The independent document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    GuildSettings,
    Messages,
    CheckSettings,
    ReviewSettings,
    AllowedServers,
    CourtSettings,
    CourtApplications,
    CourtVotes,
    FormPermissions,
}

impl Collection {
    pub const ALL: [Collection; 9] = [
        Collection::GuildSettings,
        Collection::Messages,
        Collection::CheckSettings,
        Collection::ReviewSettings,
        Collection::AllowedServers,
        Collection::CourtSettings,
        Collection::CourtApplications,
        Collection::CourtVotes,
        Collection::FormPermissions,
    ];

    /// Backing file name inside the data directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Collection::GuildSettings => "settings.json",
            Collection::Messages => "messages.json",
            Collection::CheckSettings => "checkSettings.json",
            Collection::ReviewSettings => "reviewSettings.json",
            Collection::AllowedServers => "allowedServers.json",
            Collection::CourtSettings => "courtSettings.json",
            Collection::CourtApplications => "courtApplications.json",
            Collection::CourtVotes => "courtVotes.json",
            Collection::FormPermissions => "formPermissions.json",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Collection::GuildSettings => "guild_settings",
            Collection::Messages => "messages",
            Collection::CheckSettings => "check_settings",
            Collection::ReviewSettings => "review_settings",
            Collection::AllowedServers => "allowed_servers",
            Collection::CourtSettings => "court_settings",
            Collection::CourtApplications => "court_applications",
            Collection::CourtVotes => "court_votes",
            Collection::FormPermissions => "form_permissions",
        };
        write!(f, "{}", name)
    }
}
