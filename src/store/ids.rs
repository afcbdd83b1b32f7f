//! Integer identifier allocation
//!
//! The next id is always derived from the records themselves: scan the whole
//! collection, take the largest numeric id and add one. No counter is stored,
//! so ids lost with their records can be handed out again.

use crate::error::AppResult;
use crate::store::{Collection, CollectionMap, DocumentStore, Fields, Mutation};
use serde_json::Value;
use tracing::debug;

/// Interpret an id field value as a positive integer.
///
/// Accepts JSON numbers (fractional part dropped) and strings with leading
/// decimal digits, optionally signed with `+`. Anything else, including
/// zero, is not an id.
pub fn numeric_id(value: &Value) -> Option<u64> {
    let id = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 1.0).map(|f| f.trunc() as u64)),
        Value::String(s) => {
            let s = s.trim_start();
            let s = s.strip_prefix('+').unwrap_or(s);
            let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u64>().ok()
        }
        _ => None,
    };
    id.filter(|id| *id > 0)
}

/// Compute `max(id_field) + 1` over a loaded collection, or 1 if it has none
pub fn next_id_in(documents: &CollectionMap, id_field: &str) -> u64 {
    documents
        .values()
        .filter_map(|doc| doc.get(id_field))
        .filter_map(numeric_id)
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

impl DocumentStore {
    /// Next free id for `id_field` in `collection`.
    ///
    /// Two callers racing on this value can both receive the same id; use
    /// [`DocumentStore::insert_with_next_id`] when allocating for a new record.
    pub async fn next_id(&self, collection: Collection, id_field: &str) -> u64 {
        let documents = self.get_all(collection).await;
        let id = next_id_in(&documents, id_field);
        debug!("Next {} for {} is {}", id_field, collection, id);
        id
    }

    /// Allocate the next id and insert `document` under `key` in one locked cycle.
    ///
    /// The allocated id is written into `id_field` of the stored document.
    pub async fn insert_with_next_id(
        &self,
        collection: Collection,
        key: &str,
        id_field: &str,
        mut document: Fields,
    ) -> AppResult<(u64, Value)> {
        let (id, stored) = self
            .mutate(collection, |documents| {
                let id = next_id_in(documents, id_field);
                document.insert(id_field.to_string(), Value::from(id));
                let stored = Value::Object(document);
                documents.insert(key.to_string(), stored.clone());
                Mutation::Changed((id, stored))
            })
            .await?;

        debug!("Allocated {} {} for {} [{}]", id_field, id, collection, key);
        Ok((id, stored))
    }
}
