use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use shopcall_feed::{BlobStore, FeedChannel};
use shopcall_types::wire::MessageRecord;

use crate::error::EngineError;

/// Media types an attachment may declare.
const ACCEPTED_MEDIA_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/gif"];

/// Extensions sniffed out of message content to decide "is an image".
const IMAGE_EXTENSIONS: [&str; 4] = [".jpeg", ".jpg", ".png", ".gif"];

/// What a message's content string carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Image,
}

/// Stored records carry no kind tag; an image is recognized purely by one
/// of the accepted extensions appearing in the content string. Blob URLs
/// keep query parameters after the extension, which is why this is a
/// containment test rather than a suffix test: old records stay readable.
pub fn content_kind(content: &str) -> ContentKind {
    if IMAGE_EXTENSIONS.iter().any(|ext| content.contains(ext)) {
        ContentKind::Image
    } else {
        ContentKind::Text
    }
}

/// An attachment as handed over by the input layer: a file name, the
/// declared media type, and the raw bytes.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub name: String,
    pub media_type: String,
    pub bytes: Bytes,
}

impl AttachmentUpload {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }
}

/// Validates, uploads and appends image attachments to the feed.
pub struct AttachmentPipeline {
    channel: FeedChannel,
    blobs: Arc<dyn BlobStore>,
}

impl AttachmentPipeline {
    pub fn new(channel: FeedChannel, blobs: Arc<dyn BlobStore>) -> Self {
        Self { channel, blobs }
    }

    /// Admit one attachment. The declared-type check runs before anything
    /// touches the network; a rejected type costs zero collaborator calls.
    /// On acceptance the bytes are uploaded and a single customer message
    /// carrying the returned URL is appended. A failed upload creates no
    /// message.
    pub async fn attach(&self, upload: AttachmentUpload) -> Result<String, EngineError> {
        if !ACCEPTED_MEDIA_TYPES.contains(&upload.media_type.as_str()) {
            return Err(EngineError::UnsupportedType(upload.media_type));
        }

        let url = self
            .blobs
            .upload(&upload.name, upload.bytes)
            .await
            .map_err(|e| EngineError::UploadFailed {
                name: upload.name.clone(),
                reason: e.to_string(),
            })?;

        // The append is an ordinary remote write: a failure here is logged
        // and swallowed, and the next snapshot stays authoritative.
        if let Err(e) = self.channel.append(MessageRecord::customer(&url)).await {
            warn!("attachment message append failed: {e}");
        } else {
            info!("attached {} as {url}", upload.name);
        }
        Ok(url)
    }
}
