use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tokio::sync::mpsc;

use shopcall_types::wire::{Document, MessageRecord};

use crate::error::FeedError;

/// A full ordered read of one collection. Subscriptions re-deliver the
/// whole set on every change; there are no deltas.
pub type Snapshot = Vec<Document>;

/// Receiving half of an ordered subscription. Dropping it unsubscribes.
pub type SnapshotReceiver = mpsc::UnboundedReceiver<Snapshot>;

/// The document-store collaborator: append-mostly collections with ordered
/// reads, single-field updates and ordered-set subscriptions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a record. The store assigns the id and the timestamp.
    async fn append(
        &self,
        collection: &str,
        record: MessageRecord,
    ) -> Result<String, FeedError>;

    /// One-shot ordered read of a collection.
    async fn read_ordered(
        &self,
        collection: &str,
        order_key: &str,
    ) -> Result<Snapshot, FeedError>;

    /// Overwrite a single field of one stored record.
    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), FeedError>;

    /// Subscribe to the full ordered record set of a collection. The
    /// current set is delivered first, then one snapshot per change.
    async fn subscribe_ordered(
        &self,
        collection: &str,
        order_key: &str,
    ) -> Result<SnapshotReceiver, FeedError>;
}

/// The blob-store collaborator: upload bytes, get back a retrievable URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, name: &str, bytes: Bytes) -> Result<String, FeedError>;
}
