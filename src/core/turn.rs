//! # Turn State
//!
//! All per-turn state in one owned struct: the accumulators that capture the
//! full answer as it arrives, the playback buffer of not-yet-displayed
//! characters, and the flags that drive the turn state machine. The struct is
//! created on submit and consumed by [`TurnState::into_record`] at commit, so
//! a turn cannot be committed twice or leak into the next question.

use std::collections::VecDeque;

use chrono::Utc;

use crate::core::conversation::ConversationRecord;

/// Where a turn currently is in its lifecycle.
///
/// `Cancelling` is orthogonal: it wins over the others once the user has asked
/// to stop, regardless of how much of the stream or buffer remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// The stream is still delivering events.
    Streaming,
    /// The stream has finished but the playback buffer still holds characters.
    Draining,
    /// User cancellation was requested; commit whatever has accumulated.
    Cancelling,
    /// Stream finished and the buffer is fully drained; ready to commit.
    Complete,
}

pub struct TurnState {
    question: String,
    asked_at: i64,
    /// Full answer text as received, independent of playback progress.
    final_answer: String,
    /// Last highlight received (the server replaces, never appends).
    final_highlight: String,
    /// Characters awaiting display, drained FIFO at the playback cadence.
    buffer: VecDeque<char>,
    stream_done: bool,
    cancelled: bool,
}

impl TurnState {
    pub fn new(question: String) -> Self {
        Self {
            question,
            asked_at: Utc::now().timestamp(),
            final_answer: String::new(),
            final_highlight: String::new(),
            buffer: VecDeque::new(),
            stream_done: false,
            cancelled: false,
        }
    }

    /// Appends an answer increment to the accumulator and enqueues its
    /// characters for playback. Increments arrive ordered from a single
    /// connection, so plain concatenation preserves the answer.
    pub fn accept_chunk(&mut self, text: &str) {
        self.final_answer.push_str(text);
        self.buffer.extend(text.chars());
    }

    /// Replaces the highlight. Last write wins if the server repeats it.
    pub fn replace_highlight(&mut self, text: String) {
        self.final_highlight = text;
    }

    pub fn highlight(&self) -> &str {
        &self.final_highlight
    }

    /// Pops the next character for display, oldest first.
    pub fn pop_char(&mut self) -> Option<char> {
        self.buffer.pop_front()
    }

    pub fn has_pending_chars(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn mark_stream_done(&mut self) {
        self.stream_done = true;
    }

    pub fn stream_done(&self) -> bool {
        self.stream_done
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn phase(&self) -> TurnPhase {
        if self.cancelled {
            TurnPhase::Cancelling
        } else if !self.stream_done {
            TurnPhase::Streaming
        } else if self.has_pending_chars() {
            TurnPhase::Draining
        } else {
            TurnPhase::Complete
        }
    }

    /// Consumes the turn into its permanent record. The record carries the
    /// accumulated answer, not the displayed prefix, so a fast `done` or a
    /// cancellation never loses text the buffer had not played yet.
    pub fn into_record(self) -> ConversationRecord {
        ConversationRecord {
            question: self.question,
            answer: self.final_answer,
            highlight: self.final_highlight,
            asked_at: self.asked_at,
        }
    }
}
