//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! and drives the answer engine from keyboard events.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Redraw Strategy
//!
//! The event loop uses conditional redraw to avoid unnecessary work:
//!
//! - **Playing back** (an answer is typing out): draws every ~33ms so the
//!   character-by-character playback and spinner stay smooth.
//! - **Idle**: sleeps up to 250ms, only redraws on events or resize.
//!
//! A `SteadyBlock` cursor style is used instead of a blinking cursor because
//! ratatui's `set_cursor_position` resets the terminal's blink timer on every
//! `draw()` call, making blinking cursors appear erratic during continuous
//! redraws.

mod event;
mod input_box;
mod ui;

use log::{info, warn};
use std::io::stdout;
use std::sync::Arc;

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
};
use crossterm::execute;

use crate::core::config::ResolvedConfig;
use crate::core::engine::{AnswerEngine, EngineError};
use crate::core::transcript;
use crate::stream::SseAnswerSource;
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};
use crate::tui::input_box::{InputBox, InputEvent};
use crate::tui::ui::HistoryState;

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    // Persistent component states
    pub input_box: InputBox,
    pub history: HistoryState,
    /// The question of the in-flight turn, shown above the live answer until
    /// the turn commits.
    pub pending_question: Option<String>,
    pub status_message: String,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            input_box: InputBox::new(),
            history: HistoryState::new(),
            pending_question: None,
            status_message: String::new(),
        }
    }
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,                        // Show cursor for input editing
            SetCursorStyle::SteadyBlock, // Non-blinking: avoids blink timer reset from continuous redraws
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, steady block cursor)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            DisableMouseCapture,
            DisableBracketedPaste,
            Hide // Hide cursor on exit
        );
    }
}

pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let document = config
        .document
        .clone()
        .expect("document must be set (config file, FOLIO_DOCUMENT env var, or --document)");

    let source = Arc::new(SseAnswerSource::new(config.base_url.clone()));
    let mut engine = AnswerEngine::new(source, config.playback_settings());
    let mut view_rx = engine.view();
    let conversation = engine.conversation();

    let mut tui = TuiState::new();
    let mut transcript_id: Option<String> = None;
    let mut committed_count = 0usize;

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    let start_time = std::time::Instant::now();
    let mut needs_redraw = true; // Force first frame

    loop {
        let view = view_rx.borrow_and_update().clone();

        // Snapshot the committed records; the engine's turn task pushes into
        // the same store from its own task.
        let records = conversation.lock().unwrap().records().to_vec();

        // A new commit: the pending question is now part of the history, and
        // the transcript on disk should catch up.
        if records.len() > committed_count {
            committed_count = records.len();
            tui.pending_question = None;
            transcript::save_current_transcript(
                &mut transcript_id,
                &conversation.lock().unwrap(),
                &document,
            );
            needs_redraw = true;
        }

        let animating = view.is_loading;
        if animating {
            needs_redraw = true;
        }

        if needs_redraw {
            let spinner_frame = (start_time.elapsed().as_secs_f32() * 12.0) as usize;
            terminal.draw(|f| {
                ui::draw_ui(f, &records, &view, &mut tui, &document, spinner_frame)
            })?;
            needs_redraw = false;
        }

        // Dynamic poll timeout: short while an answer is playing back
        let timeout = if animating {
            std::time::Duration::from_millis(33)
        } else {
            std::time::Duration::from_millis(250)
        };
        let first_event = poll_event_timeout(timeout);

        // Process first event + drain ALL pending events before next draw
        let mut should_quit = false;
        if first_event.is_some() {
            needs_redraw = true;
        }
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            match event {
                // Resize just needs a redraw (already flagged above)
                TuiEvent::Resize => {}

                TuiEvent::ForceQuit => {
                    should_quit = true;
                }

                // Esc while an answer is playing back cancels it; the engine
                // commits whatever has been received so far.
                TuiEvent::Escape => {
                    if view.is_loading {
                        engine.cancel_current_answer();
                        tui.status_message = "Cancelled".to_string();
                    }
                }

                TuiEvent::ScrollUp => tui.history.scroll_up(1),
                TuiEvent::ScrollDown => tui.history.scroll_down(1),
                TuiEvent::ScrollPageUp => {
                    let page = tui.history.page_height();
                    tui.history.scroll_up(page);
                }
                TuiEvent::ScrollPageDown => {
                    let page = tui.history.page_height();
                    tui.history.scroll_down(page);
                }
                TuiEvent::ScrollToBottom => tui.history.scroll_to_bottom(),

                // Everything else is text editing
                ref event => {
                    if let Some(InputEvent::Submit(text)) = tui.input_box.handle_event(event) {
                        let question = text.trim().to_string();
                        if question.is_empty() {
                            continue;
                        }
                        match engine.ask_question(&document, &question) {
                            Ok(()) => {
                                tui.pending_question = Some(question);
                                tui.status_message.clear();
                                tui.history.scroll_to_bottom();
                            }
                            Err(EngineError::TurnInProgress) => {
                                warn!("Question rejected: turn in progress");
                                tui.status_message =
                                    "Wait for the current answer (Esc to cancel)".to_string();
                            }
                        }
                    }
                }
            }
        }

        if should_quit {
            break;
        }

        if view_rx.has_changed().unwrap_or(false) {
            needs_redraw = true;
        }
    }

    // Save on exit if there's content
    transcript::save_current_transcript(&mut transcript_id, &conversation.lock().unwrap(), &document);

    ratatui::restore();
    Ok(())
}
