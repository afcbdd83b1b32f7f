//! Tribunal applications and votes

use crate::error::AppResult;
use crate::repository::{into_fields, record_key};
use crate::store::{Collection, CollectionMap, Document, DocumentStore, Fields};
use std::sync::Arc;

const APPLICATION_KEY_FIELD: &str = "messageId";
const APPLICATION_ID_FIELD: &str = "courtId";
const VOTE_KEY_FIELD: &str = "threadId";

/// Court applications keyed by `messageId` (numbered by `courtId`) and
/// court votes keyed by discussion `threadId`
#[derive(Clone)]
pub struct CourtRepository {
    store: Arc<DocumentStore>,
}

impl CourtRepository {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn save_application(&self, application: Document) -> AppResult<Document> {
        let key = record_key(&application, APPLICATION_KEY_FIELD)?;
        self.store.save(Collection::CourtApplications, &key, application).await
    }

    pub async fn get_application(&self, message_id: &str) -> Option<Document> {
        self.store.get(Collection::CourtApplications, message_id).await
    }

    pub async fn update_application(&self, message_id: &str, updates: Fields) -> AppResult<Option<Document>> {
        self.store
            .update(Collection::CourtApplications, message_id, updates)
            .await
    }

    pub async fn get_all_applications(&self) -> CollectionMap {
        self.store.get_all(Collection::CourtApplications).await
    }

    pub async fn next_court_id(&self) -> u64 {
        self.store
            .next_id(Collection::CourtApplications, APPLICATION_ID_FIELD)
            .await
    }

    /// Assign the next `courtId` to `application` and save it atomically
    pub async fn create_application_with_next_id(&self, application: Document) -> AppResult<(u64, Document)> {
        let key = record_key(&application, APPLICATION_KEY_FIELD)?;
        let fields = into_fields(application)?;
        self.store
            .insert_with_next_id(Collection::CourtApplications, &key, APPLICATION_ID_FIELD, fields)
            .await
    }

    pub async fn save_vote(&self, vote: Document) -> AppResult<Document> {
        let key = record_key(&vote, VOTE_KEY_FIELD)?;
        self.store.save(Collection::CourtVotes, &key, vote).await
    }

    pub async fn get_vote(&self, thread_id: &str) -> Option<Document> {
        self.store.get(Collection::CourtVotes, thread_id).await
    }

    pub async fn update_vote(&self, thread_id: &str, updates: Fields) -> AppResult<Option<Document>> {
        self.store.update(Collection::CourtVotes, thread_id, updates).await
    }

    pub async fn get_all_votes(&self) -> CollectionMap {
        self.store.get_all(Collection::CourtVotes).await
    }
}
