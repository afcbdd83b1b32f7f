//! Cross-guild whitelist relations
//!
//! Stored as `{ownerGuildId: {targetGuildId: {allowedForums: [...]}}}`. A
//! relation with no forums still whitelists the target guild; only a missing
//! or empty relation means "not whitelisted".
//!
//! Relations are edited in place on the raw JSON. A write touches only the
//! target it names; sibling relations and unknown fields are written back
//! exactly as they were read.

use crate::error::AppResult;
use crate::store::{Collection, CollectionMap, DocumentStore, Fields, Mutation};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ALLOWED_FORUMS: &str = "allowedForums";

/// Combined view of one relation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitelistDetails {
    pub allowed: bool,
    pub allowed_forums: Vec<String>,
}

#[derive(Clone)]
pub struct WhitelistRepository {
    store: Arc<DocumentStore>,
}

impl WhitelistRepository {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Target guilds whitelisted by `guild_id`, sorted by guild id
    pub async fn get_allowed_servers(&self, guild_id: &str) -> Vec<String> {
        let documents = self.store.get_all(Collection::AllowedServers).await;
        let servers: Vec<String> = match documents.get(guild_id) {
            Some(Value::Object(relations)) => relations
                .iter()
                .filter(|(_, relation)| is_present(relation))
                .map(|(target, _)| target.clone())
                .collect(),
            _ => Vec::new(),
        };
        debug!("Allowed servers for {}: {:?}", guild_id, servers);
        servers
    }

    /// Whitelist `target_guild_id`. Returns false if it already was.
    pub async fn add_allowed_server(&self, guild_id: &str, target_guild_id: &str) -> AppResult<bool> {
        let added = self
            .store
            .mutate(Collection::AllowedServers, |documents| {
                let Some(relations) = relations_mut(documents, guild_id) else {
                    return Mutation::Unchanged(false);
                };
                if relations.get(target_guild_id).is_some_and(is_present) {
                    return Mutation::Unchanged(false);
                }
                relations.insert(target_guild_id.to_string(), empty_relation());
                Mutation::Changed(true)
            })
            .await?;

        if added {
            info!("Whitelisted server {} for {}", target_guild_id, guild_id);
        } else {
            debug!("Server {} already whitelisted for {}", target_guild_id, guild_id);
        }
        Ok(added)
    }

    /// Drop the relation and all of its forums. Returns false if absent.
    pub async fn remove_allowed_server(&self, guild_id: &str, target_guild_id: &str) -> AppResult<bool> {
        let removed = self
            .store
            .mutate(Collection::AllowedServers, |documents| {
                let Some(Value::Object(relations)) = documents.get_mut(guild_id) else {
                    return Mutation::Unchanged(false);
                };
                if !relations.get(target_guild_id).is_some_and(is_present) {
                    return Mutation::Unchanged(false);
                }
                relations.remove(target_guild_id);
                Mutation::Changed(true)
            })
            .await?;

        if removed {
            info!("Removed server {} from whitelist of {}", target_guild_id, guild_id);
        }
        Ok(removed)
    }

    pub async fn is_server_allowed(&self, guild_id: &str, target_guild_id: &str) -> bool {
        self.relation(guild_id, target_guild_id).await.is_some()
    }

    pub async fn get_allowed_forums(&self, guild_id: &str, target_guild_id: &str) -> Vec<String> {
        self.relation(guild_id, target_guild_id)
            .await
            .map(|relation| forums_of(&relation))
            .unwrap_or_default()
    }

    /// Whitelist a forum channel, creating the server relation if needed.
    /// Returns false if the forum was already present.
    pub async fn add_allowed_forum(&self, guild_id: &str, target_guild_id: &str, forum_id: &str) -> AppResult<bool> {
        let added = self
            .store
            .mutate(Collection::AllowedServers, |documents| {
                let Some(relations) = relations_mut(documents, guild_id) else {
                    return Mutation::Unchanged(false);
                };
                let relation = relations
                    .entry(target_guild_id.to_string())
                    .or_insert_with(empty_relation);
                if !relation.is_object() {
                    *relation = empty_relation();
                }
                let Some(fields) = relation.as_object_mut() else {
                    return Mutation::Unchanged(false);
                };

                let forums = fields.entry(ALLOWED_FORUMS).or_insert_with(|| json!([]));
                if !forums.is_array() {
                    *forums = json!([]);
                }
                let Some(forums) = forums.as_array_mut() else {
                    return Mutation::Unchanged(false);
                };
                if forums.iter().any(|f| f.as_str() == Some(forum_id)) {
                    return Mutation::Unchanged(false);
                }
                forums.push(Value::from(forum_id));
                Mutation::Changed(true)
            })
            .await?;

        if added {
            info!("Whitelisted forum {} of {} for {}", forum_id, target_guild_id, guild_id);
        } else {
            debug!("Forum {} of {} already whitelisted for {}", forum_id, target_guild_id, guild_id);
        }
        Ok(added)
    }

    /// Returns false if the relation or the forum is absent
    pub async fn remove_allowed_forum(&self, guild_id: &str, target_guild_id: &str, forum_id: &str) -> AppResult<bool> {
        let removed = self
            .store
            .mutate(Collection::AllowedServers, |documents| {
                let forums = documents
                    .get_mut(guild_id)
                    .and_then(|relations| relations.get_mut(target_guild_id))
                    .and_then(|relation| relation.get_mut(ALLOWED_FORUMS))
                    .and_then(Value::as_array_mut);
                let Some(forums) = forums else {
                    return Mutation::Unchanged(false);
                };

                let before = forums.len();
                forums.retain(|f| f.as_str() != Some(forum_id));
                if forums.len() == before {
                    return Mutation::Unchanged(false);
                }
                Mutation::Changed(true)
            })
            .await?;

        if removed {
            info!("Removed forum {} of {} from whitelist of {}", forum_id, target_guild_id, guild_id);
        }
        Ok(removed)
    }

    pub async fn is_forum_allowed(&self, guild_id: &str, target_guild_id: &str, forum_id: &str) -> bool {
        self.get_allowed_forums(guild_id, target_guild_id)
            .await
            .iter()
            .any(|f| f == forum_id)
    }

    pub async fn get_server_whitelist_details(&self, guild_id: &str, target_guild_id: &str) -> WhitelistDetails {
        match self.relation(guild_id, target_guild_id).await {
            Some(relation) => WhitelistDetails {
                allowed: true,
                allowed_forums: forums_of(&relation),
            },
            None => WhitelistDetails {
                allowed: false,
                allowed_forums: Vec::new(),
            },
        }
    }

    async fn relation(&self, guild_id: &str, target_guild_id: &str) -> Option<Value> {
        let mut documents = self.store.get_all(Collection::AllowedServers).await;
        documents
            .get_mut(guild_id)
            .and_then(|relations| relations.get_mut(target_guild_id))
            .map(Value::take)
            .filter(is_present)
    }
}

/// The owner's relation map, created empty if missing.
///
/// A non-object owner entry cannot hold relations and is replaced.
fn relations_mut<'a>(documents: &'a mut CollectionMap, guild_id: &str) -> Option<&'a mut Fields> {
    let owner = documents
        .entry(guild_id.to_string())
        .or_insert_with(|| Value::Object(Fields::new()));
    if !owner.is_object() {
        warn!("Whitelist of guild {} is not an object, starting over", guild_id);
        *owner = Value::Object(Fields::new());
    }
    owner.as_object_mut()
}

fn empty_relation() -> Value {
    json!({ "allowedForums": [] })
}

/// A relation exists when its value is truthy: not null, false, 0 or ""
fn is_present(relation: &Value) -> bool {
    match relation {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// String forum ids of a relation; a missing or non-list field means none
fn forums_of(relation: &Value) -> Vec<String> {
    relation
        .get(ALLOWED_FORUMS)
        .and_then(Value::as_array)
        .map(|forums| forums.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}
