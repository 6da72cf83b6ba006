use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use shopcall_feed::{FeedChannel, Snapshot};
use shopcall_types::models::{Message, Vote};

use crate::error::EngineError;

/// Locally-owned ordered view of one conversation's remote feed.
///
/// The store subscribes once and replaces its whole transcript with every
/// delivered snapshot; it never merges or diffs. Exactly one conversation
/// per instance: a second `open` is rejected, and a store whose subscribe
/// failed stays unusable; build a new one to retry.
///
/// Callers must `close` on every exit path; close synchronously stops
/// snapshot delivery even while a subscribe is still in flight. In-flight
/// appends are not cancelled, their results are simply dropped.
pub struct ConversationStore {
    channel: FeedChannel,
    shared: Arc<Shared>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

struct Shared {
    transcript: RwLock<Vec<Message>>,
    notify: RwLock<Option<Arc<dyn Fn() + Send + Sync>>>,
    opened: AtomicBool,
    closed: AtomicBool,
}

impl ConversationStore {
    pub fn new(channel: FeedChannel) -> Self {
        Self {
            channel,
            shared: Arc::new(Shared {
                transcript: RwLock::new(Vec::new()),
                notify: RwLock::new(None),
                opened: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
            pump: Mutex::new(None),
        }
    }

    pub fn channel(&self) -> &FeedChannel {
        &self.channel
    }

    /// Establish the subscription and start mirroring snapshots. `notify`
    /// runs after every transcript replacement until the store is closed.
    pub async fn open<F>(&self, notify: F) -> Result<(), EngineError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if self.shared.opened.swap(true, Ordering::SeqCst) {
            return Err(EngineError::AlreadyOpen);
        }
        let notify: Arc<dyn Fn() + Send + Sync> = Arc::new(notify);
        *self.shared.notify.write().unwrap() = Some(notify);

        let mut rx = match self.channel.subscribe().await {
            Ok(rx) => rx,
            Err(e) => {
                warn!("subscribe to {} failed: {e}", self.channel.collection());
                return Err(EngineError::Sync(e));
            }
        };

        // The caller may have closed while the subscribe was in flight;
        // the receiver is dropped without a single callback.
        if self.shared.closed.load(Ordering::SeqCst) {
            debug!("{} closed during subscribe", self.channel.collection());
            return Ok(());
        }

        let shared = self.shared.clone();
        let collection = self.channel.collection().to_string();
        let handle = tokio::spawn(async move {
            while let Some(snapshot) = rx.recv().await {
                if shared.closed.load(Ordering::SeqCst) {
                    break;
                }
                shared.apply_snapshot(snapshot);
            }
            debug!("snapshot pump for {collection} ended");
        });
        *self.pump.lock().unwrap() = Some(handle);

        info!("opened conversation {}", self.channel.collection());
        Ok(())
    }

    /// Release the subscription. Synchronous: no notify callback runs after
    /// this returns. Idempotent.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.pump.lock().unwrap().take() {
            handle.abort();
        }
        info!("closed conversation {}", self.channel.collection());
    }

    /// Read-only copy of the current transcript.
    pub fn transcript(&self) -> Vec<Message> {
        self.shared.transcript.read().unwrap().clone()
    }

    pub fn message(&self, id: &str) -> Option<Message> {
        self.shared
            .transcript
            .read()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    /// Optimistic local patch after a successful feedback write, so the UI
    /// does not wait for the next snapshot. Returns false when the id is
    /// not in the transcript.
    pub fn apply_feedback(&self, id: &str, vote: Vote) -> bool {
        let patched = {
            let mut transcript = self.shared.transcript.write().unwrap();
            match transcript.iter_mut().find(|m| m.id == id) {
                Some(message) => {
                    message.feedback = vote.feedback();
                    true
                }
                None => false,
            }
        };
        if patched {
            self.shared.ping();
        }
        patched
    }
}

impl Drop for ConversationStore {
    fn drop(&mut self) {
        self.close();
    }
}

impl Shared {
    /// Whole-snapshot replacement: duplicate ids are dropped (first
    /// occurrence wins), then the set is stable-sorted ascending by server
    /// timestamp, with pending stamps after assigned ones and ties broken by the
    /// store's insertion order.
    fn apply_snapshot(&self, snapshot: Snapshot) {
        let mut seen = HashSet::new();
        let mut next: Vec<Message> = snapshot
            .into_iter()
            .filter(|doc| seen.insert(doc.id.clone()))
            .map(|doc| doc.into_message())
            .collect();
        next.sort_by_key(|m| (m.created_at.is_none(), m.created_at, m.seq));

        *self.transcript.write().unwrap() = next;
        self.ping();
    }

    fn ping(&self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        let notify = self.notify.read().unwrap().clone();
        if let Some(notify) = notify {
            notify();
        }
    }
}
