use thiserror::Error;

use shopcall_feed::FeedError;

/// Failure taxonomy of the widget core. Remote-write failures inside the
/// engine are logged and swallowed; these variants cover the cases a caller
/// must react to.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Initial subscribe or ordered read failed. The transcript stays
    /// empty; there is no retry.
    #[error("conversation sync failed: {0}")]
    Sync(#[from] FeedError),

    #[error("conversation is already open")]
    AlreadyOpen,

    #[error("message text is empty")]
    EmptyMessage,

    #[error("no canned response for quick reply {0:?}")]
    UnknownQuickReply(String),

    #[error("feedback does not apply to message {0}")]
    NotApplicable(String),

    #[error("unsupported attachment type {0:?}")]
    UnsupportedType(String),

    #[error("upload of {name} failed: {reason}")]
    UploadFailed { name: String, reason: String },
}
