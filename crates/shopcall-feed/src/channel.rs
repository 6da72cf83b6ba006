use std::sync::Arc;

use serde_json::json;

use shopcall_types::models::Vote;
use shopcall_types::wire::MessageRecord;

use crate::error::FeedError;
use crate::store::{DocumentStore, Snapshot, SnapshotReceiver};

/// Order key of every conversation collection.
pub const ORDER_KEY: &str = "created_time";

/// Field overwritten by usefulness votes.
pub const FEEDBACK_FIELD: &str = "isUseful";

/// One conversation's view of the document store: every call is scoped to
/// the conversation's message collection.
#[derive(Clone)]
pub struct FeedChannel {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl FeedChannel {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Conversation collections live under `chatroom/{shop_id}/messages`.
    pub fn for_shop(store: Arc<dyn DocumentStore>, shop_id: &str) -> Self {
        Self::new(store, format!("chatroom/{shop_id}/messages"))
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn append(&self, record: MessageRecord) -> Result<String, FeedError> {
        self.store.append(&self.collection, record).await
    }

    pub async fn read(&self) -> Result<Snapshot, FeedError> {
        self.store.read_ordered(&self.collection, ORDER_KEY).await
    }

    pub async fn set_feedback(&self, id: &str, vote: Vote) -> Result<(), FeedError> {
        self.store
            .update_field(&self.collection, id, FEEDBACK_FIELD, json!(vote.wire()))
            .await
    }

    pub async fn subscribe(&self) -> Result<SnapshotReceiver, FeedError> {
        self.store.subscribe_ordered(&self.collection, ORDER_KEY).await
    }
}
