use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Feedback, Message, Sender};

/// A message as written to and read from the remote document store. The
/// field spellings are the stored contract; do not rename them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub content: String,
    /// Server-assigned; null while the write is still pending.
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    pub from: Sender,
    /// Marks the welcome banner that carries the quick-reply menu.
    #[serde(rename = "isQA", default, skip_serializing_if = "is_false")]
    pub is_qa: bool,
    /// `"Yes"` / `"No"`, absent until someone votes.
    #[serde(rename = "isUseful", default, skip_serializing_if = "Option::is_none")]
    pub is_useful: Option<String>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl MessageRecord {
    /// A customer-authored record awaiting its server timestamp.
    pub fn customer(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            created_time: None,
            from: Sender::Customer,
            is_qa: false,
            is_useful: None,
        }
    }

    /// A shop-authored record awaiting its server timestamp.
    pub fn shop(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            created_time: None,
            from: Sender::Shop,
            is_qa: false,
            is_useful: None,
        }
    }

    /// The welcome banner carrying the quick-reply menu.
    pub fn shop_menu(content: impl Into<String>) -> Self {
        Self {
            is_qa: true,
            ..Self::shop(content)
        }
    }
}

/// One element of the ordered record set a subscription delivers: the
/// store-assigned id and insertion order plus the record itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub seq: u64,
    #[serde(flatten)]
    pub record: MessageRecord,
}

impl Document {
    /// Project the stored record into the transcript model.
    pub fn into_message(self) -> Message {
        Message {
            id: self.id,
            content: self.record.content,
            created_at: self.record.created_time,
            sender: self.record.from,
            quick_reply_menu: self.record.is_qa,
            feedback: Feedback::from_wire(self.record.is_useful.as_deref()),
            seq: self.seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_spellings_are_preserved() {
        let record = MessageRecord {
            is_useful: Some("Yes".into()),
            ..MessageRecord::shop_menu("hello")
        };
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["from"], "shop");
        assert_eq!(json["isQA"], true);
        assert_eq!(json["isUseful"], "Yes");
        assert!(json["created_time"].is_null());
    }

    #[test]
    fn optional_flags_are_omitted_when_unset() {
        let json = serde_json::to_value(MessageRecord::customer("hi")).unwrap();

        assert_eq!(json["from"], "user1");
        assert!(json.get("isQA").is_none());
        assert!(json.get("isUseful").is_none());
    }

    #[test]
    fn stored_record_without_optional_fields_parses() {
        let record: MessageRecord = serde_json::from_str(
            r#"{"content":"老紀錄","created_time":"2024-08-23T15:37:00Z","from":"user1"}"#,
        )
        .unwrap();

        assert_eq!(record.from, Sender::Customer);
        assert!(!record.is_qa);
        assert_eq!(record.is_useful, None);
    }

    #[test]
    fn document_projects_into_message() {
        let doc = Document {
            id: "m1".into(),
            seq: 7,
            record: MessageRecord {
                is_useful: Some("No".into()),
                ..MessageRecord::shop("回覆")
            },
        };

        let message = doc.into_message();
        assert_eq!(message.id, "m1");
        assert_eq!(message.seq, 7);
        assert_eq!(message.sender, Sender::Shop);
        assert_eq!(message.feedback, Feedback::NotUseful);
        assert_eq!(message.created_at, None);
    }
}
