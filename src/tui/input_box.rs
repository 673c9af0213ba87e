//! # InputBox Component
//!
//! Single-line question input. Handles editing (cursor movement, backspace,
//! delete, paste) and submission. The buffer is internal state; the parent
//! only sees the emitted [`InputEvent`]s.

use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::tui::event::TuiEvent;

/// Horizontal space consumed by the left and right borders.
const BORDER_OVERHEAD: u16 = 2;

/// High-level events emitted by the InputBox
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// User submitted the text (Enter pressed). The buffer has been cleared.
    Submit(String),
    /// Text content changed
    ContentChanged,
}

pub struct InputBox {
    /// Text buffer
    buffer: String,
    /// Cursor position as a byte offset into `buffer`, always on a char boundary
    cursor: usize,
}

impl Default for InputBox {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBox {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            cursor: 0,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn handle_event(&mut self, event: &TuiEvent) -> Option<InputEvent> {
        match event {
            TuiEvent::InputChar(c) => {
                self.buffer.insert(self.cursor, *c);
                self.cursor += c.len_utf8();
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Paste(data) => {
                // The question box is single-line; flatten pasted newlines
                let flat = data.replace(['\r', '\n'], " ");
                self.buffer.insert_str(self.cursor, &flat);
                self.cursor += flat.len();
                Some(InputEvent::ContentChanged)
            }
            TuiEvent::Backspace => {
                if self.cursor > 0 {
                    let prev = prev_char_boundary(&self.buffer, self.cursor);
                    self.buffer.drain(prev..self.cursor);
                    self.cursor = prev;
                    Some(InputEvent::ContentChanged)
                } else {
                    None
                }
            }
            TuiEvent::Delete => {
                if self.cursor < self.buffer.len() {
                    let next = next_char_boundary(&self.buffer, self.cursor);
                    self.buffer.drain(self.cursor..next);
                    Some(InputEvent::ContentChanged)
                } else {
                    None
                }
            }
            TuiEvent::CursorLeft => {
                if self.cursor > 0 {
                    self.cursor = prev_char_boundary(&self.buffer, self.cursor);
                }
                None
            }
            TuiEvent::CursorRight => {
                if self.cursor < self.buffer.len() {
                    self.cursor = next_char_boundary(&self.buffer, self.cursor);
                }
                None
            }
            TuiEvent::CursorHome => {
                self.cursor = 0;
                None
            }
            TuiEvent::CursorEnd => {
                self.cursor = self.buffer.len();
                None
            }
            TuiEvent::Submit => {
                let text = std::mem::take(&mut self.buffer);
                self.cursor = 0;
                Some(InputEvent::Submit(text))
            }
            _ => None,
        }
    }

    /// Renders the input box and places the terminal cursor, scrolling
    /// horizontally so the cursor stays visible in a long question.
    pub fn render(&self, frame: &mut Frame, area: Rect, dimmed: bool) {
        let inner_width = area.width.saturating_sub(BORDER_OVERHEAD);
        let cursor_col = self.buffer[..self.cursor].width() as u16;
        let scroll = cursor_col.saturating_sub(inner_width.saturating_sub(1));

        let style = if dimmed {
            Style::default().add_modifier(Modifier::DIM)
        } else {
            Style::default()
        };

        let input = Paragraph::new(self.buffer.as_str())
            .style(style)
            .scroll((0, scroll))
            .block(
                Block::bordered()
                    .title("Ask")
                    .border_style(Style::default().fg(Color::Cyan)),
            );
        frame.render_widget(input, area);

        frame.set_cursor_position(Position {
            x: area.x + 1 + (cursor_col - scroll),
            y: area.y + 1,
        });
    }
}

/// Largest char boundary strictly before `idx`.
fn prev_char_boundary(s: &str, idx: usize) -> usize {
    let mut i = idx.saturating_sub(1);
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char boundary strictly after `idx`.
fn next_char_boundary(s: &str, idx: usize) -> usize {
    let mut i = idx + 1;
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i.min(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(input: &mut InputBox, text: &str) {
        for c in text.chars() {
            input.handle_event(&TuiEvent::InputChar(c));
        }
    }

    #[test]
    fn test_typing_appends_at_cursor() {
        let mut input = InputBox::new();
        type_str(&mut input, "hello");
        assert_eq!(input.buffer(), "hello");
    }

    #[test]
    fn test_submit_drains_the_buffer() {
        let mut input = InputBox::new();
        type_str(&mut input, "a question");
        let event = input.handle_event(&TuiEvent::Submit);
        assert_eq!(event, Some(InputEvent::Submit("a question".to_string())));
        assert_eq!(input.buffer(), "");
    }

    #[test]
    fn test_backspace_removes_whole_characters() {
        let mut input = InputBox::new();
        type_str(&mut input, "héllo");
        input.handle_event(&TuiEvent::Backspace);
        input.handle_event(&TuiEvent::Backspace);
        input.handle_event(&TuiEvent::Backspace);
        input.handle_event(&TuiEvent::Backspace);
        assert_eq!(input.buffer(), "h");
    }

    #[test]
    fn test_insert_in_the_middle() {
        let mut input = InputBox::new();
        type_str(&mut input, "ac");
        input.handle_event(&TuiEvent::CursorLeft);
        input.handle_event(&TuiEvent::InputChar('b'));
        assert_eq!(input.buffer(), "abc");
    }

    #[test]
    fn test_delete_removes_forward() {
        let mut input = InputBox::new();
        type_str(&mut input, "ab");
        input.handle_event(&TuiEvent::CursorHome);
        input.handle_event(&TuiEvent::Delete);
        assert_eq!(input.buffer(), "b");
    }

    #[test]
    fn test_paste_flattens_newlines() {
        let mut input = InputBox::new();
        input.handle_event(&TuiEvent::Paste("multi\nline\r\npaste".to_string()));
        assert_eq!(input.buffer(), "multi line  paste");
    }

    #[test]
    fn test_backspace_on_empty_buffer_is_a_noop() {
        let mut input = InputBox::new();
        assert_eq!(input.handle_event(&TuiEvent::Backspace), None);
        assert_eq!(input.buffer(), "");
    }
}
