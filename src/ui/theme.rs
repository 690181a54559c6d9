//! Feed theme
//!
//! Black "screen" behind every page, white text, and the two short-video
//! brand accents (cyan and red-pink) for controls and state.

use ratatui::style::{Color, Modifier, Style};

/// Color palette and style helpers
pub struct Theme;

impl Theme {
    /// Page background: #000000
    pub const SCREEN: Color = Color::Rgb(0x00, 0x00, 0x00);

    /// Chrome (title bar, status bar): #121212
    pub const CHROME: Color = Color::Rgb(0x12, 0x12, 0x12);

    /// Text: #f1f1f1
    pub const TEXT: Color = Color::Rgb(0xf1, 0xf1, 0xf1);

    /// Dim text: #8a8a8a
    pub const DIM: Color = Color::Rgb(0x8a, 0x8a, 0x8a);

    /// Cyan accent: #25f4ee
    pub const CYAN: Color = Color::Rgb(0x25, 0xf4, 0xee);

    /// Pink accent: #fe2c55
    pub const PINK: Color = Color::Rgb(0xfe, 0x2c, 0x55);

    /// Error: #ff4d4f
    pub const ERROR: Color = Color::Rgb(0xff, 0x4d, 0x4f);

    /// Unfilled progress track: #3a3a3a
    pub const TRACK: Color = Color::Rgb(0x3a, 0x3a, 0x3a);

    pub fn screen() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::SCREEN)
    }

    pub fn chrome() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::CHROME)
    }

    pub fn text() -> Style {
        Style::default().fg(Self::TEXT)
    }

    pub fn dimmed() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn title() -> Style {
        Style::default().fg(Self::TEXT).add_modifier(Modifier::BOLD)
    }

    /// File name of the current page
    pub fn caption() -> Style {
        Style::default().fg(Self::TEXT).add_modifier(Modifier::BOLD)
    }

    pub fn error() -> Style {
        Style::default().fg(Self::ERROR).add_modifier(Modifier::BOLD)
    }

    pub fn loading() -> Style {
        Style::default().fg(Self::CYAN).add_modifier(Modifier::BOLD)
    }

    /// Duration readout badge
    pub fn badge() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::CHROME)
    }

    /// Play/pause glyph
    pub fn control() -> Style {
        Style::default().fg(Self::PINK).add_modifier(Modifier::BOLD)
    }

    pub fn progress_filled() -> Style {
        Style::default().fg(Self::PINK).bg(Self::TRACK)
    }

    pub fn keybind() -> Style {
        Style::default().fg(Self::CYAN)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn border_focused() -> Style {
        Style::default().fg(Self::CYAN).add_modifier(Modifier::BOLD)
    }

    pub fn input() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::CHROME)
    }
}
