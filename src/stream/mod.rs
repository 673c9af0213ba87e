pub mod source;
pub mod sse;

pub use source::{AnswerSource, StreamError, StreamEvent};
pub use sse::SseAnswerSource;
