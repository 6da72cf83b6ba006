pub mod channel;
pub mod error;
pub mod memory;
pub mod store;

pub use channel::FeedChannel;
pub use error::FeedError;
pub use memory::{MemoryBlobStore, MemoryStore};
pub use store::{BlobStore, DocumentStore, Snapshot, SnapshotReceiver};
