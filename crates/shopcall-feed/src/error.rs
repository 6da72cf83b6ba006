use thiserror::Error;

/// Failures surfaced by the document-store and blob-store collaborators.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("subscribe to {collection} failed: {reason}")]
    Subscribe { collection: String, reason: String },

    #[error("write to {collection} failed: {reason}")]
    Write { collection: String, reason: String },

    #[error("no document {id} in {collection}")]
    UnknownDocument { collection: String, id: String },

    #[error("upload of {name} failed: {reason}")]
    Upload { name: String, reason: String },
}
