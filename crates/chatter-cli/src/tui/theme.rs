//! Color palette

use ratatui::style::Color;

/// Colors used across the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    pub bg_color: Color,
    pub text_color: Color,
    pub dim_color: Color,
    pub border_color: Color,
    pub accent_color: Color,
    pub user_msg_color: Color,
    pub assistant_msg_color: Color,
    pub status_bar_bg_color: Color,
    pub processing_color: Color,
    pub warning_color: Color,
    pub error_color: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            bg_color: Color::Rgb(24, 24, 32),
            text_color: Color::Rgb(220, 220, 230),
            dim_color: Color::Rgb(120, 120, 140),
            border_color: Color::Rgb(60, 60, 80),
            accent_color: Color::Rgb(255, 140, 80),
            user_msg_color: Color::Rgb(130, 170, 255),
            assistant_msg_color: Color::Rgb(255, 140, 80),
            status_bar_bg_color: Color::Rgb(32, 32, 44),
            processing_color: Color::Rgb(190, 150, 255),
            warning_color: Color::Rgb(240, 200, 90),
            error_color: Color::Rgb(240, 100, 100),
        }
    }
}
