//! Single-line message input

use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::tui::theme::Theme;

/// Editable line with a cursor
#[derive(Debug, Default)]
pub struct InputLine {
    content: String,
    /// Cursor position in the content (byte offset, always on a char boundary)
    cursor: usize,
}

impl InputLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Take the text out, leaving the input empty
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.content)
    }

    pub fn insert_char(&mut self, ch: char) {
        self.content.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn insert_str(&mut self, text: &str) {
        // Pasted newlines become spaces; Enter sends
        let text = text.replace(['\r', '\n'], " ");
        self.content.insert_str(self.cursor, &text);
        self.cursor += text.len();
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.content[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.content[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }

    pub fn backspace(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.content.replace_range(prev..self.cursor, "");
            self.cursor = prev;
        }
    }

    pub fn delete(&mut self) {
        if let Some(next) = self.next_boundary() {
            self.content.replace_range(self.cursor..next, "");
        }
    }

    pub fn move_left(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.cursor = prev;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(next) = self.next_boundary() {
            self.cursor = next;
        }
    }

    /// Apply an editing key; returns false for keys the input does not handle
    pub fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);
        match code {
            KeyCode::Char('a') if ctrl => self.cursor = 0,
            KeyCode::Char('e') if ctrl => self.cursor = self.content.len(),
            KeyCode::Char('u') if ctrl => {
                self.content.replace_range(..self.cursor, "");
                self.cursor = 0;
            }
            KeyCode::Char(_) if ctrl => return false,
            KeyCode::Char(ch) => self.insert_char(ch),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.content.len(),
            _ => return false,
        }
        true
    }

    /// Display column of the cursor
    pub fn cursor_column(&self) -> usize {
        self.content[..self.cursor].width()
    }

    /// Render the input box and place the terminal cursor
    pub fn render(&self, f: &mut Frame, area: Rect, theme: &Theme, busy: bool) {
        let border_color = if busy {
            theme.processing_color
        } else {
            theme.accent_color
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color));
        let inner = block.inner(area);
        f.render_widget(block, area);

        // Horizontal scroll so the cursor stays visible
        let visible = inner.width.saturating_sub(2) as usize;
        let cursor_col = self.cursor_column();
        let skip_cols = cursor_col.saturating_sub(visible.saturating_sub(1));

        let mut skipped = 0;
        let shown: String = self
            .content
            .chars()
            .skip_while(|c| {
                if skipped < skip_cols {
                    skipped += c.width().unwrap_or(0);
                    true
                } else {
                    false
                }
            })
            .collect();

        let line = Line::from(vec![
            Span::raw(" "),
            Span::styled(shown, Style::default().fg(theme.text_color)),
        ]);
        f.render_widget(Paragraph::new(line), inner);

        let x = inner.x + 1 + cursor_col.saturating_sub(skipped).min(visible) as u16;
        f.set_cursor_position((x, inner.y));
    }
}
