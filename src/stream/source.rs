use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

/// Errors that can occur while opening or reading an answer stream.
#[derive(Debug, PartialEq)]
pub enum StreamError {
    /// Network-level failure (timeout, DNS, connection dropped mid-stream).
    Network(String),
    /// The server returned an error response instead of a stream.
    Api { status: u16, message: String },
    /// A frame could not be decoded. Terminates the stream like a network failure.
    Parse(String),
    /// Neither the end sentinel nor an error arrived within the watchdog window.
    TimedOut(u64),
    /// The mpsc channel was closed (the turn consumer dropped the receiver).
    ChannelClosed,
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Network(msg) => write!(f, "network error: {msg}"),
            StreamError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            StreamError::Parse(msg) => write!(f, "parse error: {msg}"),
            StreamError::TimedOut(secs) => write!(f, "stream timed out after {secs}s"),
            StreamError::ChannelClosed => write!(f, "channel closed"),
        }
    }
}

impl std::error::Error for StreamError {}

/// One decoded frame from the answer stream.
///
/// Sources send `Highlight`, `Chunk`, and `Done`. `Failed` is injected by the
/// engine when [`AnswerSource::open`] returns `Err` — a source never sends it
/// itself, and nothing follows it on the channel.
#[derive(Debug, PartialEq)]
pub enum StreamEvent {
    /// Supporting excerpt from the document. At most one is expected per
    /// question; if the server repeats it, the last value wins.
    Highlight(String),
    /// An increment of answer text, to be concatenated in arrival order.
    Chunk(String),
    /// End-of-stream sentinel. The connection closes after this.
    Done,
    Failed(StreamError),
}

#[async_trait]
pub trait AnswerSource: Send + Sync {
    /// Returns the name of the source (for logs).
    fn name(&self) -> &str;

    /// Opens one streaming connection for `(document, question)` and sends
    /// decoded events to the channel until the stream ends or fails.
    async fn open(
        &self,
        document: &str,
        question: &str,
        events: Sender<StreamEvent>,
    ) -> Result<(), StreamError>;
}
