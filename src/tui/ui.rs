//! Chat view rendering: committed question/answer records, the in-flight
//! turn's typed-out answer, and the highlight excerpt supporting each answer.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect, Size};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::widgets::{Block, BorderType, Padding, Paragraph, Wrap};
use tui_scrollview::{ScrollView, ScrollViewState, ScrollbarVisibility};

use crate::core::conversation::ConversationRecord;
use crate::core::engine::LiveView;
use crate::tui::TuiState;

/// Horizontal padding (per side) between the border and text content.
const CONTENT_PAD_H: u16 = 1;
/// Total horizontal space consumed by borders and padding.
const HORIZONTAL_OVERHEAD: u16 = 2 + CONTENT_PAD_H * 2;
/// Total vertical space consumed by borders (1 top + 1 bottom).
const VERTICAL_OVERHEAD: u16 = 2;

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Who a chat entry belongs to; decides title and styling.
#[derive(Debug, Clone, Copy, PartialEq)]
enum EntryKind {
    Question,
    Answer,
    Highlight,
    Error,
}

/// One bordered block in the chat view, built fresh each frame.
struct Entry {
    kind: EntryKind,
    content: String,
    /// Spinner suffix on the title while this entry is still being typed.
    spinner: Option<&'static str>,
}

impl Entry {
    fn new(kind: EntryKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            spinner: None,
        }
    }

    fn with_spinner(mut self, frame: usize) -> Self {
        self.spinner = Some(SPINNER_FRAMES[frame % SPINNER_FRAMES.len()]);
        self
    }

    fn title(&self) -> String {
        let base = match self.kind {
            EntryKind::Question => "you",
            EntryKind::Answer => "folio",
            EntryKind::Highlight => "highlight",
            EntryKind::Error => "error",
        };
        match self.spinner {
            Some(s) => format!("{base} {s}"),
            None => base.to_string(),
        }
    }

    fn style(&self) -> Style {
        match self.kind {
            EntryKind::Question => Style::default().fg(Color::Cyan),
            EntryKind::Answer => Style::default().fg(Color::Green),
            EntryKind::Highlight => Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            EntryKind::Error => Style::default().fg(Color::Red),
        }
    }

    /// Predicts rendered height with `textwrap` options that match Ratatui's
    /// `Paragraph` wrapping, so scroll positions can be laid out without
    /// rendering first.
    fn calculate_height(&self, width: u16) -> u16 {
        let content_width = width.saturating_sub(HORIZONTAL_OVERHEAD);
        if content_width == 0 {
            return 1;
        }

        let content = self.content.trim();
        if content.is_empty() {
            return VERTICAL_OVERHEAD;
        }

        let options = textwrap::Options::new(content_width as usize)
            .break_words(true)
            .word_separator(textwrap::WordSeparator::AsciiSpace);
        let lines = textwrap::wrap(content, options);
        (lines.len() as u16).max(1) + VERTICAL_OVERHEAD
    }
}

/// Scroll state for the chat history. Persisted in `TuiState` across frames.
pub struct HistoryState {
    pub scroll_state: ScrollViewState,
    /// When true, auto-scroll to bottom on new content
    pub stick_to_bottom: bool,
    /// Last known viewport height (for scroll clamping between frames)
    viewport_height: u16,
    /// Total content height from the previous layout pass
    content_height: u16,
}

impl Default for HistoryState {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryState {
    pub fn new() -> Self {
        Self {
            scroll_state: ScrollViewState::default(),
            stick_to_bottom: true, // Start attached to bottom
            viewport_height: 0,
            content_height: 0,
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.stick_to_bottom = false;
        let offset = self.scroll_state.offset();
        self.scroll_state.set_offset(Position {
            x: offset.x,
            y: offset.y.saturating_sub(lines),
        });
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let offset = self.scroll_state.offset();
        self.scroll_state.set_offset(Position {
            x: offset.x,
            y: offset.y.saturating_add(lines),
        });
        self.clamp_scroll();
        self.repin_if_at_bottom();
    }

    pub fn page_height(&self) -> u16 {
        self.viewport_height.max(1)
    }

    pub fn scroll_to_bottom(&mut self) {
        self.stick_to_bottom = true;
    }

    /// Clamp scroll offset so it never exceeds the content bounds.
    fn clamp_scroll(&mut self) {
        let max_y = self.content_height.saturating_sub(self.viewport_height);
        let current = self.scroll_state.offset();
        if current.y > max_y {
            self.scroll_state.set_offset(Position {
                x: current.x,
                y: max_y,
            });
        }
    }

    /// Re-engage auto-scroll when the user has scrolled back to the bottom.
    fn repin_if_at_bottom(&mut self) {
        let max_y = self.content_height.saturating_sub(self.viewport_height);
        if self.scroll_state.offset().y >= max_y {
            self.stick_to_bottom = true;
        }
    }
}

pub fn draw_ui(
    frame: &mut Frame,
    records: &[ConversationRecord],
    view: &LiveView,
    tui: &mut TuiState,
    document: &str,
    spinner_frame: usize,
) {
    use Constraint::{Length, Min};
    let layout = Layout::vertical([Length(1), Min(0), Length(3)]);
    let [title_area, main_area, input_area] = layout.areas(frame.area());

    // Title bar
    let title_text = if tui.status_message.is_empty() {
        format!("Folio — {document}")
    } else {
        format!("Folio — {document} | {}", tui.status_message)
    };
    frame.render_widget(Span::raw(title_text), title_area);

    // Chat history
    let entries = build_entries(records, view, tui.pending_question.as_deref(), spinner_frame);
    draw_history(frame, main_area, &entries, &mut tui.history);

    // Input box (dimmed while an answer is playing back)
    tui.input_box.render(frame, input_area, view.is_loading);
}

/// Flattens records plus the in-flight turn into renderable entries.
fn build_entries(
    records: &[ConversationRecord],
    view: &LiveView,
    pending_question: Option<&str>,
    spinner_frame: usize,
) -> Vec<Entry> {
    let mut entries = Vec::new();

    for record in records {
        entries.push(Entry::new(EntryKind::Question, record.question.clone()));
        entries.push(Entry::new(EntryKind::Answer, record.answer.clone()));
        if !record.highlight.is_empty() {
            entries.push(Entry::new(EntryKind::Highlight, record.highlight.clone()));
        }
    }

    if view.is_loading {
        if let Some(question) = pending_question {
            entries.push(Entry::new(EntryKind::Question, question));
        }
        if !view.live_highlight.is_empty() {
            entries.push(Entry::new(EntryKind::Highlight, view.live_highlight.clone()));
        }
        entries
            .push(Entry::new(EntryKind::Answer, view.live_answer.clone()).with_spinner(spinner_frame));
    } else if !view.live_answer.is_empty() {
        // A failed turn leaves its message in the live answer; show it inline
        // without persisting anything.
        if let Some(question) = pending_question {
            entries.push(Entry::new(EntryKind::Question, question));
        }
        entries.push(Entry::new(EntryKind::Error, view.live_answer.clone()));
    }

    entries
}

/// Total canvas height for the history. Saturates instead of overflowing u16
/// on very long conversations; entries past the cap pin to the bottom edge.
fn sum_heights(heights: &[u16]) -> u16 {
    heights.iter().fold(0u16, |acc, &h| acc.saturating_add(h))
}

fn draw_history(frame: &mut Frame, area: Rect, entries: &[Entry], state: &mut HistoryState) {
    let content_width = area.width.saturating_sub(1);

    let heights: Vec<u16> = entries
        .iter()
        .map(|e| e.calculate_height(content_width))
        .collect();
    let total_height = sum_heights(&heights);

    state.viewport_height = area.height;
    state.content_height = total_height;

    if !state.stick_to_bottom {
        state.clamp_scroll();
    }

    let mut scroll_view = ScrollView::new(Size::new(content_width, total_height))
        .vertical_scrollbar_visibility(ScrollbarVisibility::Always)
        .horizontal_scrollbar_visibility(ScrollbarVisibility::Never);

    let mut y_offset: u16 = 0;
    for (entry, &height) in entries.iter().zip(&heights) {
        let style = entry.style();
        let block = Block::bordered()
            .title(entry.title())
            .border_type(BorderType::Rounded)
            .border_style(style.add_modifier(Modifier::DIM))
            .title_style(style)
            .padding(Padding::horizontal(CONTENT_PAD_H));
        let paragraph = Paragraph::new(entry.content.trim())
            .style(style)
            .wrap(Wrap { trim: true })
            .block(block);

        let rect = Rect::new(0, y_offset, content_width, height);
        scroll_view.render_widget(paragraph, rect);
        y_offset = y_offset.saturating_add(height);
    }

    if state.stick_to_bottom {
        state.scroll_state.scroll_to_bottom();
    }

    frame.render_stateful_widget(scroll_view, area, &mut state.scroll_state);
}
