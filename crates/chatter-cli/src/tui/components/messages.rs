//! Transcript view
//!
//! Renders the current snapshot inside a rounded block. The view follows the
//! bottom of the conversation unless the user has scrolled up.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use chatter_core::{Message, Role};

use crate::tui::theme::Theme;
use crate::tui::utils::wrap_text;

/// Symbol prefixes for message roles (with trailing space)
const USER_SYMBOL: &str = "⤷ ";
const ASSISTANT_SYMBOL: &str = "⬡ ";
/// Display width of the symbol prefix
const SYMBOL_WIDTH: usize = 2;

/// Appended to a reply that is still receiving fragments
const STREAMING_CURSOR: &str = "▍";

/// Build display lines for `messages` wrapped to `width` columns
pub fn build_lines<'a>(messages: &[Message], width: usize, theme: &Theme) -> Vec<Line<'a>> {
    let wrap_width = width.saturating_sub(SYMBOL_WIDTH).max(1);
    let mut lines = Vec::new();

    for (idx, message) in messages.iter().enumerate() {
        if idx > 0 {
            lines.push(Line::default());
        }

        let (symbol, color) = match message.role {
            Role::User => (USER_SYMBOL, theme.user_msg_color),
            Role::Assistant => (ASSISTANT_SYMBOL, theme.assistant_msg_color),
        };
        let text_style = Style::default().fg(theme.text_color);

        let rows = wrap_text(&message.content, wrap_width);
        let last = rows.len().saturating_sub(1);
        for (row_idx, row) in rows.into_iter().enumerate() {
            let prefix = if row_idx == 0 {
                Span::styled(symbol, Style::default().fg(color))
            } else {
                Span::raw(" ".repeat(SYMBOL_WIDTH))
            };
            let mut spans = vec![prefix, Span::styled(row, text_style)];
            if message.streaming && row_idx == last {
                spans.push(Span::styled(
                    STREAMING_CURSOR,
                    Style::default()
                        .fg(theme.processing_color)
                        .add_modifier(Modifier::SLOW_BLINK),
                ));
            }
            lines.push(Line::from(spans));
        }
    }

    lines
}

/// Render the transcript panel
///
/// `scroll_from_bottom` counts rows hidden below the viewport; it is clamped
/// to the content and the clamped value is returned.
pub fn render_messages(
    f: &mut Frame,
    area: Rect,
    theme: &Theme,
    messages: &[Message],
    scroll_from_bottom: usize,
) -> usize {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border_color));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if messages.is_empty() {
        let hint = Paragraph::new(Line::from(Span::styled(
            " Type a message and press Enter",
            Style::default().fg(theme.dim_color),
        )));
        f.render_widget(hint, inner);
        return 0;
    }

    // One column of padding on each side
    let content_width = inner.width.saturating_sub(2) as usize;
    let lines = build_lines(messages, content_width, theme);

    let height = inner.height as usize;
    let max_scroll = lines.len().saturating_sub(height);
    let scroll_from_bottom = scroll_from_bottom.min(max_scroll);
    let top = max_scroll - scroll_from_bottom;

    let content_area = Rect::new(
        inner.x.saturating_add(1),
        inner.y,
        inner.width.saturating_sub(2),
        inner.height,
    );
    let paragraph = Paragraph::new(lines).scroll((top.min(u16::MAX as usize) as u16, 0));
    f.render_widget(paragraph, content_area);

    scroll_from_bottom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_lines_for_exchange() {
        let theme = Theme::default();
        let mut reply = Message::assistant_placeholder();
        reply.content = "Hello".to_string();
        reply.streaming = false;
        let messages = vec![Message::user("Hi"), reply];

        let lines: Vec<String> = build_lines(&messages, 40, &theme).iter().map(plain).collect();
        assert_eq!(lines, vec!["⤷ Hi", "", "⬡ Hello"]);
    }

    #[test]
    fn test_streaming_reply_shows_cursor() {
        let theme = Theme::default();
        let mut reply = Message::assistant_placeholder();
        reply.content = "Hel".to_string();

        let lines = build_lines(&[reply], 40, &theme);
        assert_eq!(plain(&lines[0]), "⬡ Hel▍");
    }

    #[test]
    fn test_empty_placeholder_still_has_a_row() {
        let theme = Theme::default();
        let lines = build_lines(&[Message::assistant_placeholder()], 40, &theme);
        assert_eq!(lines.len(), 1);
        assert_eq!(plain(&lines[0]), "⬡ ▍");
    }

    #[test]
    fn test_continuation_rows_are_indented() {
        let theme = Theme::default();
        let lines: Vec<String> = build_lines(&[Message::user("aaaa bbbb")], 6, &theme)
            .iter()
            .map(plain)
            .collect();
        assert_eq!(lines, vec!["⤷ aaaa", "  bbbb"]);
    }
}
