use std::sync::Arc;

use tracing::{debug, warn};

use shopcall_feed::FeedChannel;
use shopcall_types::models::{Feedback, Message, Sender, Vote};

use crate::banner;
use crate::conversation::ConversationStore;
use crate::error::EngineError;

/// Which vote affordances render for a message. The separator glyph between
/// the two controls renders only while both controls do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackControls {
    pub useful: bool,
    pub not_useful: bool,
    pub separator: bool,
}

impl FeedbackControls {
    /// Votes apply to shop-authored messages that are not system banners;
    /// everything else renders no controls at all. On an eligible message
    /// each control hides once the opposite vote is set, so the two votes
    /// are never shown as simultaneously active.
    pub fn for_message(message: &Message) -> Self {
        let eligible = message.sender == Sender::Shop && !banner::is_banner(message);
        if !eligible {
            return Self::default();
        }

        let useful = message.feedback != Feedback::NotUseful;
        let not_useful = message.feedback != Feedback::Useful;
        Self {
            useful,
            not_useful,
            separator: useful && not_useful,
        }
    }
}

/// Applies usefulness votes: the remote single-field write first, then the
/// optimistic local patch so the UI does not wait for the next snapshot.
///
/// Concurrent voters on the same message are last-write-wins at the remote
/// store; nothing reconciles them locally, and the transcript converges to
/// whatever the next snapshot carries.
pub struct FeedbackTracker {
    store: Arc<ConversationStore>,
    channel: FeedChannel,
}

impl FeedbackTracker {
    pub fn new(store: Arc<ConversationStore>, channel: FeedChannel) -> Self {
        Self { store, channel }
    }

    /// Vote on a message. Ineligible targets (customer messages, banners,
    /// unknown ids) return `NotApplicable` without any remote write. A vote
    /// equal to the current value is still written; the write is not
    /// compared against local state. A failed remote write is logged and
    /// swallowed; the local value is left untouched.
    pub async fn set_feedback(&self, message_id: &str, vote: Vote) -> Result<(), EngineError> {
        let Some(message) = self.store.message(message_id) else {
            return Err(EngineError::NotApplicable(message_id.to_string()));
        };
        if message.sender != Sender::Shop || banner::is_banner(&message) {
            return Err(EngineError::NotApplicable(message_id.to_string()));
        }

        if let Err(e) = self.channel.set_feedback(message_id, vote).await {
            warn!("feedback write for {message_id} failed: {e}");
            return Ok(());
        }

        self.store.apply_feedback(message_id, vote);
        debug!("message {message_id} marked {:?}", vote.feedback());
        Ok(())
    }
}
