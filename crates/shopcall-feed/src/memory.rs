use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use shopcall_types::wire::{Document, MessageRecord};

use crate::channel::ORDER_KEY;
use crate::error::FeedError;
use crate::store::{BlobStore, DocumentStore, Snapshot, SnapshotReceiver};

/// In-process document store with the collaborator's observable behavior:
/// store-assigned ids, strictly monotonic server timestamps, and a full
/// ordered snapshot delivered to every subscriber after each mutation.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    collections: HashMap<String, CollectionState>,
    last_stamp: Option<DateTime<Utc>>,
    next_seq: u64,
}

#[derive(Default)]
struct CollectionState {
    docs: Vec<Document>,
    subscribers: Vec<mpsc::UnboundedSender<Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current ordered contents of a collection. Missing collections read
    /// as empty, matching the remote store.
    pub fn documents(&self, collection: &str) -> Snapshot {
        let inner = self.inner.lock().unwrap();
        inner
            .collections
            .get(collection)
            .map(|c| ordered(&c.docs))
            .unwrap_or_default()
    }
}

impl StoreInner {
    /// Server timestamps never repeat, even within one millisecond.
    fn assign_stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if last >= now => last + TimeDelta::milliseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn fan_out(&mut self, collection: &str) {
        let Some(state) = self.collections.get_mut(collection) else {
            return;
        };
        let snapshot = ordered(&state.docs);
        // Closed receivers are pruned as they are discovered.
        state.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

fn ordered(docs: &[Document]) -> Snapshot {
    let mut snapshot = docs.to_vec();
    snapshot.sort_by_key(|d| (d.record.created_time, d.seq));
    snapshot
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn append(
        &self,
        collection: &str,
        record: MessageRecord,
    ) -> Result<String, FeedError> {
        let mut inner = self.inner.lock().unwrap();

        let id = Uuid::new_v4().to_string();
        let stamp = inner.assign_stamp();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let state = inner.collections.entry(collection.to_string()).or_default();
        state.docs.push(Document {
            id: id.clone(),
            seq,
            record: MessageRecord {
                created_time: Some(stamp),
                ..record
            },
        });
        debug!("appended {id} to {collection}");

        inner.fan_out(collection);
        Ok(id)
    }

    async fn read_ordered(
        &self,
        collection: &str,
        order_key: &str,
    ) -> Result<Snapshot, FeedError> {
        check_order_key(collection, order_key)?;
        Ok(self.documents(collection))
    }

    async fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), FeedError> {
        let mut inner = self.inner.lock().unwrap();

        let state = inner.collections.get_mut(collection).ok_or_else(|| {
            FeedError::UnknownDocument {
                collection: collection.to_string(),
                id: id.to_string(),
            }
        })?;
        let doc = state
            .docs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| FeedError::UnknownDocument {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        doc.record = patch_field(&doc.record, field, value).map_err(|reason| {
            FeedError::Write {
                collection: collection.to_string(),
                reason,
            }
        })?;

        inner.fan_out(collection);
        Ok(())
    }

    async fn subscribe_ordered(
        &self,
        collection: &str,
        order_key: &str,
    ) -> Result<SnapshotReceiver, FeedError> {
        check_order_key(collection, order_key)?;

        let mut inner = self.inner.lock().unwrap();
        let state = inner.collections.entry(collection.to_string()).or_default();

        let (tx, rx) = mpsc::unbounded_channel();
        // The current set is delivered before any change notification.
        let _ = tx.send(ordered(&state.docs));
        state.subscribers.push(tx);

        debug!("new subscriber on {collection}");
        Ok(rx)
    }
}

fn check_order_key(collection: &str, order_key: &str) -> Result<(), FeedError> {
    if order_key != ORDER_KEY {
        return Err(FeedError::Subscribe {
            collection: collection.to_string(),
            reason: format!("unsupported order key {order_key:?}"),
        });
    }
    Ok(())
}

/// Generic single-field overwrite via the record's wire form, so the store
/// stays agnostic of which fields exist. A value that does not fit the
/// record's shape is rejected before anything is stored.
fn patch_field(record: &MessageRecord, field: &str, value: Value) -> Result<MessageRecord, String> {
    let mut wire = match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        Ok(_) | Err(_) => return Err("record does not serialize to an object".into()),
    };
    wire.insert(field.to_string(), value);
    serde_json::from_value(Value::Object(wire)).map_err(|e| e.to_string())
}

/// In-process blob store: keeps the bytes, hands back a retrievable URL
/// that ends in the uploaded file's name.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Bytes>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<Bytes> {
        self.blobs.lock().unwrap().get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, name: &str, bytes: Bytes) -> Result<String, FeedError> {
        if bytes.is_empty() {
            return Err(FeedError::Upload {
                name: name.to_string(),
                reason: "empty payload".into(),
            });
        }
        let url = format!("https://blob.shopcall.dev/images/{}/{name}", Uuid::new_v4());
        self.blobs.lock().unwrap().insert(url.clone(), bytes);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAT: &str = "chatroom/shop1/messages";

    #[tokio::test]
    async fn timestamps_are_strictly_monotonic() {
        let store = MemoryStore::new();
        for _ in 0..50 {
            store.append(CHAT, MessageRecord::customer("hi")).await.unwrap();
        }

        let docs = store.documents(CHAT);
        for pair in docs.windows(2) {
            assert!(pair[0].record.created_time < pair[1].record.created_time);
        }
    }

    #[tokio::test]
    async fn subscriber_gets_current_set_then_changes() {
        let store = MemoryStore::new();
        store.append(CHAT, MessageRecord::customer("first")).await.unwrap();

        let mut rx = store.subscribe_ordered(CHAT, ORDER_KEY).await.unwrap();
        let initial = rx.recv().await.unwrap();
        assert_eq!(initial.len(), 1);

        store.append(CHAT, MessageRecord::shop("second")).await.unwrap();
        let next = rx.recv().await.unwrap();
        assert_eq!(next.len(), 2);
        assert_eq!(next[1].record.content, "second");
    }

    #[tokio::test]
    async fn update_field_overwrites_and_notifies() {
        let store = MemoryStore::new();
        let id = store.append(CHAT, MessageRecord::shop("回覆")).await.unwrap();
        let mut rx = store.subscribe_ordered(CHAT, ORDER_KEY).await.unwrap();
        rx.recv().await.unwrap();

        store
            .update_field(CHAT, &id, "isUseful", serde_json::json!("Yes"))
            .await
            .unwrap();

        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot[0].record.is_useful.as_deref(), Some("Yes"));
        // Untouched fields survive the patch.
        assert_eq!(snapshot[0].record.content, "回覆");
        assert!(snapshot[0].record.created_time.is_some());
    }

    #[tokio::test]
    async fn update_of_unknown_document_fails() {
        let store = MemoryStore::new();
        store.append(CHAT, MessageRecord::shop("x")).await.unwrap();

        let err = store
            .update_field(CHAT, "missing", "isUseful", serde_json::json!("Yes"))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::UnknownDocument { .. }));
    }

    #[tokio::test]
    async fn mistyped_field_value_is_rejected() {
        let store = MemoryStore::new();
        let id = store.append(CHAT, MessageRecord::shop("x")).await.unwrap();

        let err = store
            .update_field(CHAT, &id, "isQA", serde_json::json!("not-a-bool"))
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::Write { .. }));

        // Nothing was stored.
        assert_eq!(store.documents(CHAT)[0].record.is_qa, false);
    }

    #[tokio::test]
    async fn unsupported_order_key_is_rejected() {
        let store = MemoryStore::new();
        let err = store.subscribe_ordered(CHAT, "updatedTime").await.unwrap_err();
        assert!(matches!(err, FeedError::Subscribe { .. }));
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let store = MemoryStore::new();
        let rx = store.subscribe_ordered(CHAT, ORDER_KEY).await.unwrap();
        drop(rx);

        // The next mutation discovers the closed receiver and drops it.
        store.append(CHAT, MessageRecord::customer("hi")).await.unwrap();
        let inner = store.inner.lock().unwrap();
        assert!(inner.collections[CHAT].subscribers.is_empty());
    }

    #[tokio::test]
    async fn blob_store_urls_keep_the_file_name() {
        let blobs = MemoryBlobStore::new();
        let url = blobs.upload("cat.png", Bytes::from_static(b"png")).await.unwrap();

        assert!(url.contains("cat.png"));
        assert_eq!(blobs.get(&url).unwrap(), Bytes::from_static(b"png"));

        let err = blobs.upload("empty.gif", Bytes::new()).await.unwrap_err();
        assert!(matches!(err, FeedError::Upload { .. }));
        assert_eq!(blobs.len(), 1);
    }
}
