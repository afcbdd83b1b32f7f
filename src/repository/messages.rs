//! Proposal message records

use crate::error::AppResult;
use crate::repository::{into_fields, record_key};
use crate::store::{Collection, CollectionMap, Document, DocumentStore, Fields};
use std::sync::Arc;

const KEY_FIELD: &str = "messageId";
const ID_FIELD: &str = "proposalId";

/// Message records keyed by `messageId`, numbered by `proposalId`
#[derive(Clone)]
pub struct MessageRepository {
    store: Arc<DocumentStore>,
}

impl MessageRepository {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Save a record under its own `messageId`
    pub async fn save_message(&self, record: Document) -> AppResult<Document> {
        let key = record_key(&record, KEY_FIELD)?;
        self.store.save(Collection::Messages, &key, record).await
    }

    pub async fn get_message(&self, message_id: &str) -> Option<Document> {
        self.store.get(Collection::Messages, message_id).await
    }

    pub async fn update_message(&self, message_id: &str, updates: Fields) -> AppResult<Option<Document>> {
        self.store.update(Collection::Messages, message_id, updates).await
    }

    pub async fn get_all_messages(&self) -> CollectionMap {
        self.store.get_all(Collection::Messages).await
    }

    pub async fn next_proposal_id(&self) -> u64 {
        self.store.next_id(Collection::Messages, ID_FIELD).await
    }

    /// Assign the next `proposalId` to `record` and save it atomically
    pub async fn create_message_with_next_id(&self, record: Document) -> AppResult<(u64, Document)> {
        let key = record_key(&record, KEY_FIELD)?;
        let fields = into_fields(record)?;
        self.store
            .insert_with_next_id(Collection::Messages, &key, ID_FIELD, fields)
            .await
    }
}
