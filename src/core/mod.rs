//! # Core Engine
//!
//! This module contains Folio's business logic: the turn state machine, the
//! playback/commit coordinator, and the conversation store. It knows nothing
//! about any specific UI technology.
//!
//! ```text
//!  question ──▶ AnswerSource ──▶ StreamEvent channel
//!                                      │
//!                              turn actor (engine)
//!                  ┌───────────────────┼──────────────────┐
//!                  ▼                   ▼                  ▼
//!            TurnState buffer    LiveView (watch)    Conversation
//!            (chars pending)     live_answer,        (committed
//!                                is_loading          records)
//! ```
//!
//! ## Modules
//!
//! - [`turn`]: per-turn state — accumulators, playback buffer, phase machine
//! - [`engine`]: the turn actor, cancellation, and the exactly-once commit
//! - [`conversation`]: append-only question/answer/highlight history
//! - [`config`]: TOML config loading and resolution
//! - [`transcript`]: conversation persistence to `~/.folio/transcripts/`

pub mod config;
pub mod conversation;
pub mod engine;
pub mod transcript;
pub mod turn;
