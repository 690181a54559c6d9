//! Settings sheet
//!
//! A single text field for the source URL, drawn as a popup over the feed.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};

use crate::ui::{centered_rect, Theme};

/// Source URL field state
///
/// `cursor` counts characters, not bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupState {
    pub input: String,
    pub cursor: usize,
}

impl SetupState {
    /// Prefill the field, cursor at the end
    pub fn new(value: impl Into<String>) -> Self {
        let input = value.into();
        let cursor = input.chars().count();
        Self { input, cursor }
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.input
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    fn len(&self) -> usize {
        self.input.chars().count()
    }

    /// Insert character at cursor
    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.input.insert(at, c);
        self.cursor += 1;
    }

    /// Delete character before cursor
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.input.remove(at);
        }
    }

    /// Delete character at cursor
    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let at = self.byte_index(self.cursor);
            self.input.remove(at);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor < self.len() {
            self.cursor += 1;
        }
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.len();
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    pub fn value(&self) -> &str {
        self.input.trim()
    }
}

/// Draw the settings popup centered in `area`
pub fn render(frame: &mut Frame, area: Rect, state: &SetupState) {
    let popup = centered_rect(area, 70, 7);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .title(Span::styled(" Settings ", Theme::title()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border_focused())
        .style(Theme::chrome());
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(Span::styled("Source URL (WebDAV/HTTP listing or JSON array)", Theme::dimmed())),
        rows[0],
    );

    // Scroll the field so the cursor stays visible
    let width = rows[2].width.saturating_sub(1) as usize;
    let skip = state.cursor.saturating_sub(width);
    let visible: String = state.input.chars().skip(skip).take(width.max(1)).collect();
    frame.render_widget(Paragraph::new(visible).style(Theme::input()), rows[2]);
    frame.set_cursor_position((rows[2].x + (state.cursor - skip) as u16, rows[2].y));

    let hints = Line::from(vec![
        Span::styled("Enter", Theme::keybind()),
        Span::styled(" save  ", Theme::dimmed()),
        Span::styled("Esc", Theme::keybind()),
        Span::styled(" cancel", Theme::dimmed()),
    ]);
    frame.render_widget(Paragraph::new(hints).alignment(Alignment::Right), rows[3]);
}
