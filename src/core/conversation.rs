//! # Conversation Store
//!
//! Ordered history of finished question/answer/highlight records. The store is
//! append-only: records are pushed exactly once by the turn actor's commit
//! step and are immutable afterwards. Nothing else writes here — not the
//! playback loop, not the stream task, not the TUI.

use serde::{Deserialize, Serialize};

/// One completed turn: the question asked, the full answer, and the supporting
/// excerpt the server identified in the document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ConversationRecord {
    pub question: String,
    pub answer: String,
    /// Empty when the server sent no highlight for this question.
    pub highlight: String,
    /// Unix timestamp of when the question was submitted.
    pub asked_at: i64,
}

/// Append-only record list. The vec is private so the only mutation is `push`.
#[derive(Debug, Default)]
pub struct Conversation {
    records: Vec<ConversationRecord>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ConversationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ConversationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationRecord> {
        self.records.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(question: &str, answer: &str) -> ConversationRecord {
        ConversationRecord {
            question: question.to_string(),
            answer: answer.to_string(),
            highlight: String::new(),
            asked_at: 0,
        }
    }

    #[test]
    fn test_push_appends_in_order() {
        let mut conversation = Conversation::new();
        conversation.push(record("first?", "one"));
        conversation.push(record("second?", "two"));

        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.records()[0].question, "first?");
        assert_eq!(conversation.last().unwrap().answer, "two");
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let original = ConversationRecord {
            question: "What is this?".to_string(),
            answer: "A test.".to_string(),
            highlight: "supporting span".to_string(),
            asked_at: 1700000000,
        };
        let json = serde_json::to_string(&original).unwrap();
        let parsed: ConversationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);
    }
}
