pub mod models;
pub mod rules;
pub mod wire;

pub use models::{Feedback, Message, Sender, Vote};
pub use rules::{PatternRule, QuickReply, ResponseRules, RuleTableError};
pub use wire::{Document, MessageRecord};
