pub mod attachment;
pub mod banner;
pub mod conversation;
pub mod error;
pub mod feedback;
pub mod responder;

pub use attachment::{AttachmentPipeline, AttachmentUpload, ContentKind, content_kind};
pub use conversation::ConversationStore;
pub use error::EngineError;
pub use feedback::{FeedbackControls, FeedbackTracker};
pub use responder::{AutoResponder, ReplySaga, SagaState};
