use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message. On the wire the customer is `"user1"` and the
/// canned-response agent is `"shop"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    #[serde(rename = "user1")]
    Customer,
    #[serde(rename = "shop")]
    Shop,
}

/// Tri-state usefulness flag on a shop message. Stored as the `isUseful`
/// field: absent, `"Yes"` or `"No"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Feedback {
    #[default]
    Unset,
    Useful,
    NotUseful,
}

impl Feedback {
    /// Unrecognized stored values fall back to `Unset` rather than failing
    /// the whole snapshot.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("Yes") => Self::Useful,
            Some("No") => Self::NotUseful,
            _ => Self::Unset,
        }
    }
}

/// The two assignable vote values. `Feedback::Unset` is the initial state
/// only and is never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Useful,
    NotUseful,
}

impl Vote {
    /// Stored spelling of the vote.
    pub fn wire(self) -> &'static str {
        match self {
            Self::Useful => "Yes",
            Self::NotUseful => "No",
        }
    }

    pub fn feedback(self) -> Feedback {
        match self {
            Self::Useful => Feedback::Useful,
            Self::NotUseful => Feedback::NotUseful,
        }
    }
}

/// One entry of a conversation transcript.
///
/// `created_at` is `None` until the store assigns the server timestamp.
/// `seq` is the store-assigned insertion order and breaks timestamp ties;
/// client arrival order never decides placement.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
    pub sender: Sender,
    pub quick_reply_menu: bool,
    pub feedback: Feedback,
    pub seq: u64,
}
