//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use crate::stream::{AnswerSource, StreamError, StreamEvent};

/// One step of a scripted stream.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Highlight(&'static str),
    Chunk(&'static str),
    /// Pause between events, like a slow upstream.
    Wait(Duration),
    Done,
    /// Fail the stream with a network error carrying this message.
    Fail(&'static str),
}

/// An [`AnswerSource`] that plays back a fixed script per `open` call.
///
/// A script that ends without `Done` or `Fail` leaves the connection open
/// forever, which is how watchdog behavior is exercised.
pub struct ScriptedSource {
    scripts: Mutex<VecDeque<Vec<ScriptStep>>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<ScriptStep>) -> Self {
        Self::with_scripts(vec![script])
    }

    /// One script per expected `open` call, in order.
    pub fn with_scripts(scripts: Vec<Vec<ScriptStep>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into_iter().collect()),
        }
    }
}

#[async_trait]
impl AnswerSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn open(
        &self,
        _document: &str,
        _question: &str,
        events: Sender<StreamEvent>,
    ) -> Result<(), StreamError> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();

        for step in script {
            let event = match step {
                ScriptStep::Highlight(text) => StreamEvent::Highlight(text.to_string()),
                ScriptStep::Chunk(text) => StreamEvent::Chunk(text.to_string()),
                ScriptStep::Wait(duration) => {
                    tokio::time::sleep(duration).await;
                    continue;
                }
                ScriptStep::Done => {
                    if events.send(StreamEvent::Done).await.is_err() {
                        return Err(StreamError::ChannelClosed);
                    }
                    return Ok(());
                }
                ScriptStep::Fail(message) => {
                    return Err(StreamError::Network(message.to_string()));
                }
            };
            if events.send(event).await.is_err() {
                return Err(StreamError::ChannelClosed);
            }
        }

        // Script exhausted without a terminal step: hold the connection open.
        std::future::pending::<()>().await;
        unreachable!("pending future resolved")
    }
}
