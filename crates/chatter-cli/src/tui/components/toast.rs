//! Toast notifications for the TUI
//!
//! Controller notifications (request failures, busy warnings) surface as
//! short-lived toasts in the top-right corner.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
};
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthChar;

use chatter_core::{Notification, Severity};

use crate::tui::theme::Theme;
use crate::tui::utils::truncate_ellipsis;

/// Maximum number of visible toasts
const MAX_VISIBLE_TOASTS: usize = 3;

/// Default toast duration
const DEFAULT_DURATION: Duration = Duration::from_secs(5);

const TOAST_WIDTH: u16 = 48;

/// Toast height (borders, title row, description row)
const TOAST_HEIGHT: u16 = 4;

/// Gap between toasts
const TOAST_GAP: u16 = 1;

/// Type of toast notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastType {
    Warning,
    Error,
}

impl ToastType {
    fn color(&self, theme: &Theme) -> Color {
        match self {
            ToastType::Warning => theme.warning_color,
            ToastType::Error => theme.error_color,
        }
    }

    fn icon(&self) -> &'static str {
        match self {
            ToastType::Warning => "▲",
            ToastType::Error => "✗",
        }
    }
}

impl From<Severity> for ToastType {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Warning => ToastType::Warning,
            Severity::Error => ToastType::Error,
        }
    }
}

/// A toast notification
#[derive(Debug, Clone)]
pub struct Toast {
    pub title: String,
    pub description: String,
    /// Type of toast (affects color/icon)
    pub toast_type: ToastType,
    /// How long to show the toast
    pub duration: Duration,
    /// When the toast was created
    pub created_at: Instant,
}

impl Toast {
    fn new(title: impl Into<String>, description: impl Into<String>, toast_type: ToastType) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            toast_type,
            duration: DEFAULT_DURATION,
            created_at: Instant::now(),
        }
    }

    /// Check if the toast has expired
    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.duration
    }

    /// Get progress (0.0 to 1.0) for progress bar
    pub fn progress(&self) -> f32 {
        let elapsed = self.created_at.elapsed().as_secs_f32();
        let total = self.duration.as_secs_f32();
        (1.0 - (elapsed / total)).max(0.0)
    }
}

impl From<Notification> for Toast {
    fn from(notification: Notification) -> Self {
        Self::new(
            notification.title,
            notification.description,
            notification.severity.into(),
        )
    }
}

/// Queue of toast notifications
#[derive(Debug, Default)]
pub struct ToastQueue {
    toasts: Vec<Toast>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self { toasts: Vec::new() }
    }

    /// Add a toast to the queue
    pub fn push(&mut self, toast: Toast) {
        // An identical toast already showing is restarted instead of stacked
        if let Some(existing) = self
            .toasts
            .iter_mut()
            .find(|t| t.title == toast.title && t.description == toast.description)
        {
            existing.created_at = toast.created_at;
            return;
        }

        while self.toasts.len() >= MAX_VISIBLE_TOASTS {
            self.toasts.remove(0);
        }
        self.toasts.push(toast);
    }

    /// Remove expired toasts, returns true if any were removed
    pub fn tick(&mut self) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| !t.is_expired());
        self.toasts.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    /// Get visible toasts (most recent first)
    pub fn visible(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter().rev().take(MAX_VISIBLE_TOASTS)
    }
}

/// Render toasts in the top-right corner
pub fn render_toasts(buf: &mut Buffer, area: Rect, queue: &ToastQueue, theme: &Theme) {
    if queue.is_empty() || area.width < TOAST_WIDTH + 2 {
        return;
    }

    let start_x = area.x + area.width - TOAST_WIDTH - 2;

    for (i, toast) in queue.visible().enumerate() {
        let y = area.y + 1 + (i as u16 * (TOAST_HEIGHT + TOAST_GAP));

        if y + TOAST_HEIGHT > area.y + area.height {
            break; // Don't render off-screen
        }

        let toast_area = Rect::new(start_x, y, TOAST_WIDTH, TOAST_HEIGHT);
        render_toast(buf, toast_area, toast, theme);
    }
}

/// Write `text` starting at `x`, stopping before `max_x`
fn put_text(buf: &mut Buffer, mut x: u16, y: u16, max_x: u16, text: &str, style: Style) -> u16 {
    for ch in text.chars() {
        if x >= max_x {
            break;
        }
        if let Some(cell) = buf.cell_mut((x, y)) {
            cell.set_char(ch).set_style(style);
        }
        x += UnicodeWidthChar::width(ch).unwrap_or(1) as u16;
    }
    x
}

fn render_toast(buf: &mut Buffer, area: Rect, toast: &Toast, theme: &Theme) {
    let color = toast.toast_type.color(theme);
    let border_style = Style::default().fg(color);
    let right = area.x + area.width - 1;
    let bottom = area.y + area.height - 1;

    // Content rows get a background, borders float
    for y in (area.y + 1)..bottom {
        for x in (area.x + 1)..right {
            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.set_char(' ');
                cell.set_bg(theme.bg_color);
            }
        }
    }

    for (x, ch) in [(area.x, '╭'), (right, '╮')] {
        if let Some(cell) = buf.cell_mut((x, area.y)) {
            cell.set_char(ch).set_style(border_style);
        }
    }
    for x in (area.x + 1)..right {
        if let Some(cell) = buf.cell_mut((x, area.y)) {
            cell.set_char('─').set_style(border_style);
        }
    }
    for y in (area.y + 1)..bottom {
        for x in [area.x, right] {
            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.set_char('│').set_style(border_style);
            }
        }
    }

    // Bottom border doubles as the countdown bar
    for (x, ch) in [(area.x, '╰'), (right, '╯')] {
        if let Some(cell) = buf.cell_mut((x, bottom)) {
            cell.set_char(ch).set_style(border_style);
        }
    }
    let progress_width = ((area.width - 2) as f32 * toast.progress()) as u16;
    for (i, x) in ((area.x + 1)..right).enumerate() {
        if let Some(cell) = buf.cell_mut((x, bottom)) {
            if (i as u16) < progress_width {
                cell.set_char('━').set_fg(color);
            } else {
                cell.set_char('─').set_fg(theme.dim_color);
            }
        }
    }

    let text_max = right - 1;
    let inner_width = (area.width - 5) as usize;

    let title_y = area.y + 1;
    let icon_style = Style::default().fg(color).bg(theme.bg_color);
    let cx = put_text(buf, area.x + 2, title_y, text_max, toast.toast_type.icon(), icon_style);
    let title = truncate_ellipsis(&toast.title, inner_width.saturating_sub(1));
    put_text(
        buf,
        cx + 1,
        title_y,
        text_max,
        &title,
        Style::default().fg(theme.text_color).bg(theme.bg_color),
    );

    let description = truncate_ellipsis(&toast.description, inner_width + 1);
    put_text(
        buf,
        area.x + 2,
        title_y + 1,
        text_max,
        &description,
        Style::default().fg(theme.dim_color).bg(theme.bg_color),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_maps_to_toast() {
        let toast = Toast::from(Notification::error("Connection error", "refused"));
        assert_eq!(toast.toast_type, ToastType::Error);
        assert_eq!(toast.title, "Connection error");
        assert_eq!(toast.description, "refused");
        assert!(!toast.is_expired());
    }

    #[test]
    fn test_queue_caps_visible_toasts() {
        let mut queue = ToastQueue::new();
        for i in 0..5 {
            queue.push(Toast::from(Notification::warning(format!("t{i}"), "")));
        }
        let titles: Vec<_> = queue.visible().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["t4", "t3", "t2"]);
    }

    #[test]
    fn test_duplicate_toast_is_not_stacked() {
        let mut queue = ToastQueue::new();
        queue.push(Toast::from(Notification::warning("Still responding", "wait")));
        queue.push(Toast::from(Notification::warning("Still responding", "wait")));
        assert_eq!(queue.visible().count(), 1);
    }

    #[test]
    fn test_tick_drops_expired() {
        let mut queue = ToastQueue::new();
        let mut toast = Toast::from(Notification::error("Request failed", "500"));
        toast.duration = Duration::ZERO;
        queue.push(toast);
        assert!(queue.tick());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_render_draws_title() {
        let theme = Theme::default();
        let area = Rect::new(0, 0, 80, 12);
        let mut buf = Buffer::empty(area);
        let mut queue = ToastQueue::new();
        queue.push(Toast::from(Notification::error("Request failed", "HTTP 500")));

        render_toasts(&mut buf, area, &queue, &theme);

        let row: String = (0..area.width)
            .map(|x| buf[(x, 2)].symbol().to_string())
            .collect();
        assert!(row.contains("Request failed"), "row was {row:?}");
    }
}
