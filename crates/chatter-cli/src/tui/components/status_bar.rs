//! Status bar component - bottom bar with model, endpoint, turn phase, shortcuts

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

use chatter_core::TurnPhase;

use crate::tui::theme::Theme;
use crate::tui::utils::truncate_ellipsis;

/// Render the status bar at the bottom of the screen
pub fn render_status_bar(
    f: &mut Frame,
    area: Rect,
    theme: &Theme,
    model: &str,
    endpoint: &str,
    phase: TurnPhase,
    message_count: usize,
) {
    let bg = Paragraph::new("").style(Style::default().bg(theme.status_bar_bg_color));
    f.render_widget(bg, area);

    let model_short = truncate_ellipsis(model, 24);
    let host = shorten_endpoint(endpoint, 30);
    let sep = Span::styled(" │ ", Style::default().fg(theme.dim_color));

    let mut left_spans = vec![
        Span::raw(" "),
        Span::styled(host.clone(), Style::default().fg(theme.dim_color)),
        sep.clone(),
        Span::styled(model_short.clone(), Style::default().fg(theme.dim_color)),
    ];
    let mut left_width: u16 = 1 + host.width() as u16 + 3 + model_short.width() as u16;

    let count_text = format!("{} msgs", message_count);
    left_width += 3 + count_text.width() as u16;
    left_spans.push(sep.clone());
    left_spans.push(Span::styled(count_text, Style::default().fg(theme.dim_color)));

    if let Some(label) = phase_label(phase) {
        left_width += 3 + label.width() as u16;
        left_spans.push(sep);
        left_spans.push(Span::styled(
            label,
            Style::default().fg(theme.processing_color),
        ));
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(left_width), Constraint::Fill(1)])
        .split(area);

    f.render_widget(Paragraph::new(Line::from(left_spans)), chunks[0]);

    let available_width = chunks[1].width as usize;
    let commands = build_commands_for_width(available_width, phase, theme);
    f.render_widget(
        Paragraph::new(Line::from(commands)).alignment(Alignment::Right),
        chunks[1],
    );
}

fn phase_label(phase: TurnPhase) -> Option<&'static str> {
    match phase {
        TurnPhase::Idle => None,
        TurnPhase::Connecting => Some("● connecting"),
        TurnPhase::Streaming => Some("● streaming"),
    }
}

/// Build command spans based on available width
/// Priority (highest to lowest): quit, stop (only mid-turn), clear, send
fn build_commands_for_width<'a>(
    width: usize,
    phase: TurnPhase,
    theme: &'a Theme,
) -> Vec<Span<'a>> {
    // (key_text, desc_text, total_width including spaces)
    let commands: [(&str, &str, usize); 4] = [
        (" ^C ", "quit ", 9),
        (" Esc ", "stop ", 10),
        (" ^L ", "clear ", 10),
        (" ↵ ", "send ", 8),
    ];

    let mut spans = Vec::new();
    let mut used_width = 0;

    for (key, desc, cmd_width) in commands {
        if key == " Esc " && phase == TurnPhase::Idle {
            continue;
        }
        if used_width + cmd_width <= width {
            // Prepend so lower priority items end up on the left
            spans.insert(0, Span::styled(desc, Style::default().fg(theme.dim_color)));
            spans.insert(
                0,
                Span::styled(
                    key,
                    Style::default().bg(theme.border_color).fg(theme.text_color),
                ),
            );
            used_width += cmd_width;
        }
    }

    spans
}

/// Host and port of the endpoint URL, without scheme or path
fn shorten_endpoint(endpoint: &str, max_len: usize) -> String {
    let without_scheme = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, rest)| rest);
    let host = without_scheme.split('/').next().unwrap_or(without_scheme);
    truncate_ellipsis(host, max_len)
}
