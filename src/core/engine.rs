//! # Answer Engine
//!
//! Coordinates one question/answer turn: it spawns the stream task, owns the
//! playback cadence, and performs the exactly-once commit into the
//! conversation store.
//!
//! Each turn runs as a single actor task that owns the whole `TurnState` and
//! multiplexes three inputs with `tokio::select!`:
//!
//! - stream events (highlight, answer chunks, done, failure),
//! - a playback tick that pops one buffered character per interval,
//! - the cancellation flag.
//!
//! Because one task sees both "stream finished" and "buffer drained", the
//! completion hand-off needs no polling probe: the loop commits the moment
//! both hold. The `TurnState` is consumed by the commit, so a second commit
//! for the same turn cannot be expressed.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

use crate::core::conversation::Conversation;
use crate::core::turn::{TurnPhase, TurnState};
use crate::stream::{AnswerSource, StreamError, StreamEvent};

/// Capacity of the per-turn stream event channel.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Live values the UI observes while a turn is in flight. Reset to default
/// when the turn commits; replaced with an inline error message on failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveView {
    /// The partial answer typed out so far, a prefix of the full answer.
    pub live_answer: String,
    pub live_highlight: String,
    pub is_loading: bool,
}

/// Timing knobs for the playback loop.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackSettings {
    /// Delay between displayed characters.
    pub char_interval: Duration,
    /// How long a stream may stay silent about its outcome before the turn
    /// fails with [`StreamError::TimedOut`].
    pub stream_timeout: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            char_interval: Duration::from_millis(20),
            stream_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum EngineError {
    /// A turn is still streaming or draining; one active turn at a time.
    TurnInProgress,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::TurnInProgress => write!(f, "a question is already being answered"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Handles for the in-flight turn, kept for cancellation.
struct TurnHandle {
    cancel_tx: watch::Sender<bool>,
    stream_abort: AbortHandle,
}

pub struct AnswerEngine {
    source: Arc<dyn AnswerSource>,
    settings: PlaybackSettings,
    conversation: Arc<Mutex<Conversation>>,
    view: Arc<watch::Sender<LiveView>>,
    current: Option<TurnHandle>,
}

impl AnswerEngine {
    pub fn new(source: Arc<dyn AnswerSource>, settings: PlaybackSettings) -> Self {
        let (view_tx, _) = watch::channel(LiveView::default());
        Self {
            source,
            settings,
            conversation: Arc::new(Mutex::new(Conversation::new())),
            view: Arc::new(view_tx),
            current: None,
        }
    }

    /// The shared conversation store. Mutated only by turn commits.
    pub fn conversation(&self) -> Arc<Mutex<Conversation>> {
        Arc::clone(&self.conversation)
    }

    /// Subscribes to the live view values.
    pub fn view(&self) -> watch::Receiver<LiveView> {
        self.view.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.view.borrow().is_loading
    }

    /// Starts a new turn for `(document, question)`.
    ///
    /// Rejects while a previous turn is still streaming or draining — the
    /// engine assumes one active turn at a time.
    pub fn ask_question(&mut self, document: &str, question: &str) -> Result<(), EngineError> {
        if self.is_loading() {
            return Err(EngineError::TurnInProgress);
        }

        info!(
            "Starting turn via '{}' source: question_len={}",
            self.source.name(),
            question.len()
        );

        // Fresh per-turn state; live values start empty so nothing from the
        // previous turn can show through.
        let state = TurnState::new(question.to_string());
        self.view.send_replace(LiveView {
            is_loading: true,
            ..Default::default()
        });

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let source = Arc::clone(&self.source);
        let document = document.to_string();
        let question = question.to_string();
        let stream_task = tokio::spawn(async move {
            if let Err(e) = source.open(&document, &question, event_tx.clone()).await {
                warn!("Stream failed: {e}");
                if event_tx.send(StreamEvent::Failed(e)).await.is_err() {
                    debug!("Failure event not delivered: turn already finished");
                }
            }
        });
        let stream_abort = stream_task.abort_handle();

        tokio::spawn(run_turn(
            state,
            event_rx,
            cancel_rx,
            stream_abort.clone(),
            Arc::clone(&self.view),
            Arc::clone(&self.conversation),
            self.settings,
        ));

        self.current = Some(TurnHandle {
            cancel_tx,
            stream_abort,
        });
        Ok(())
    }

    /// Cancels the in-flight turn: closes the connection and flags the actor,
    /// which commits the partial answer. Idempotent; a no-op when no turn is
    /// active.
    pub fn cancel_current_answer(&self) {
        if let Some(handle) = &self.current {
            info!("Cancellation requested");
            let _ = handle.cancel_tx.send(true);
            handle.stream_abort.abort();
        }
    }
}

/// The per-turn actor. Runs until the turn reaches a terminal outcome, then
/// performs the single commit (or surfaces the error) and resets the view.
async fn run_turn(
    mut state: TurnState,
    mut events: mpsc::Receiver<StreamEvent>,
    mut cancel_rx: watch::Receiver<bool>,
    stream_abort: AbortHandle,
    view: Arc<watch::Sender<LiveView>>,
    conversation: Arc<Mutex<Conversation>>,
    settings: PlaybackSettings,
) {
    let mut ticker = tokio::time::interval(settings.char_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let watchdog = tokio::time::sleep(settings.stream_timeout);
    tokio::pin!(watchdog);

    let failure = loop {
        // Terminal phases are checked before every select round, so the
        // cancellation flag is observed before the next character pops and
        // completion commits as soon as the drain catches up with the stream.
        match state.phase() {
            TurnPhase::Complete | TurnPhase::Cancelling => break None,
            TurnPhase::Streaming | TurnPhase::Draining => {}
        }

        tokio::select! {
            event = events.recv(), if !state.stream_done() => match event {
                Some(StreamEvent::Chunk(text)) => state.accept_chunk(&text),
                Some(StreamEvent::Highlight(text)) => {
                    state.replace_highlight(text);
                    let highlight = state.highlight().to_string();
                    view.send_modify(|v| v.live_highlight = highlight);
                }
                Some(StreamEvent::Done) => state.mark_stream_done(),
                Some(StreamEvent::Failed(err)) => break Some(err),
                // Channel closed without a sentinel: the stream task was
                // aborted (cancellation) or already reported its outcome.
                None => state.mark_stream_done(),
            },
            _ = ticker.tick(), if state.has_pending_chars() => {
                if let Some(c) = state.pop_char() {
                    view.send_modify(|v| v.live_answer.push(c));
                }
            },
            changed = cancel_rx.changed() => {
                if changed.is_err() || *cancel_rx.borrow_and_update() {
                    state.mark_cancelled();
                }
            },
            _ = &mut watchdog, if !state.stream_done() => {
                break Some(StreamError::TimedOut(settings.stream_timeout.as_secs()));
            },
        }
    };

    // The connection has no further use in any terminal outcome.
    stream_abort.abort();

    match failure {
        None => {
            // Done and cancelled turns both commit; cancellation just commits
            // the partial accumulators instead of the full answer.
            let record = state.into_record();
            info!(
                "Committing turn: answer_len={}, highlight_len={}",
                record.answer.len(),
                record.highlight.len()
            );
            conversation.lock().unwrap().push(record);
            view.send_replace(LiveView::default());
        }
        Some(err) => {
            // Errors are shown inline and never persisted as a false answer.
            warn!("Turn failed: {err}");
            view.send_replace(LiveView {
                live_answer: format!("[Error: {err}]"),
                ..Default::default()
            });
        }
    }
}
