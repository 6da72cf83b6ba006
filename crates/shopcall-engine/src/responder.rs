use std::sync::Arc;

use tracing::{debug, warn};

use shopcall_feed::{FeedChannel, FeedError};
use shopcall_types::rules::ResponseRules;
use shopcall_types::wire::MessageRecord;

use crate::error::EngineError;

/// Progress of the two-append auto-reply sequence. The two writes are
/// independent; there is no enclosing transaction and no compensation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaState {
    AwaitingUserAck,
    AwaitingReplyAck,
    Done,
}

/// One auto-reply: the customer's message followed by the canned response.
/// A failed step leaves the saga parked at that step; `resume` retries only
/// what is still owed. A partially applied saga leaves a visible user
/// message with no reply. Accepted, never rolled back.
#[derive(Debug)]
pub struct ReplySaga {
    user: MessageRecord,
    reply: MessageRecord,
    state: SagaState,
}

impl ReplySaga {
    fn new(user: MessageRecord, reply: MessageRecord) -> Self {
        Self {
            user,
            reply,
            state: SagaState::AwaitingUserAck,
        }
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == SagaState::Done
    }

    /// Run the remaining appends in order, stopping at the first failure.
    pub async fn resume(&mut self, channel: &FeedChannel) -> Result<(), FeedError> {
        if self.state == SagaState::AwaitingUserAck {
            channel.append(self.user.clone()).await?;
            self.state = SagaState::AwaitingReplyAck;
        }
        if self.state == SagaState::AwaitingReplyAck {
            channel.append(self.reply.clone()).await?;
            self.state = SagaState::Done;
        }
        Ok(())
    }
}

/// Decides the canned reply for each newly composed customer message and
/// appends the two-message sequence to the feed.
pub struct AutoResponder {
    channel: FeedChannel,
    rules: Arc<ResponseRules>,
}

impl AutoResponder {
    pub fn new(channel: FeedChannel, rules: Arc<ResponseRules>) -> Self {
        Self { channel, rules }
    }

    /// Append the customer's text, then the first matching free-text rule's
    /// response (or the fallback). Empty and whitespace-only text is
    /// rejected before any write.
    pub async fn compose_user_message(&self, text: &str) -> Result<ReplySaga, EngineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::EmptyMessage);
        }

        let response = self.rules.match_free_text(text);
        debug!("composing reply for {text:?}");
        let saga = ReplySaga::new(MessageRecord::customer(text), MessageRecord::shop(response));
        Ok(self.drive(saga).await)
    }

    /// Append a quick-reply selection and its canned response. Unknown
    /// labels are rejected without touching the feed.
    pub async fn select_quick_reply(&self, label: &str) -> Result<ReplySaga, EngineError> {
        let Some(response) = self.rules.quick_response(label) else {
            warn!("no canned response for quick reply {label:?}");
            return Err(EngineError::UnknownQuickReply(label.to_string()));
        };

        let saga = ReplySaga::new(MessageRecord::customer(label), MessageRecord::shop(response));
        Ok(self.drive(saga).await)
    }

    async fn drive(&self, mut saga: ReplySaga) -> ReplySaga {
        if let Err(e) = saga.resume(&self.channel).await {
            // The partial sequence stays visible; the returned saga records
            // where it stopped and can be resumed by the caller.
            warn!("auto-reply append failed at {:?}: {e}", saga.state());
        }
        saga
    }
}
