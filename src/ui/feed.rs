//! Full-screen feed page
//!
//! Title bar, one page for the current video, play/pause indicator with an
//! inline progress bar, and a key hint bar.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::cache::cache_key;
use crate::feed::Feed;
use crate::models::{PlaybackPhase, PlaybackStatus};
use crate::ui::Theme;

pub const EMPTY_MESSAGE: &str = "No videos - press s to choose a source";

/// What the page on screen needs to draw itself
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSnapshot {
    /// Zero-based page index
    pub index: usize,
    pub total: usize,
    pub url: Option<String>,
    pub phase: PlaybackPhase,
    pub status: PlaybackStatus,
}

impl PageSnapshot {
    pub fn of(feed: &Feed) -> Self {
        let (phase, status) = feed
            .current_item()
            .map(|vm| (vm.phase().clone(), vm.status()))
            .unwrap_or_default();
        Self {
            index: feed.current(),
            total: feed.len(),
            url: feed.current_url().map(str::to_string),
            phase,
            status,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// "3/12", or empty for an empty feed
    pub fn indicator(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            format!("{}/{}", self.index + 1, self.total)
        }
    }

    /// Decoded file name of the current video
    pub fn caption(&self) -> String {
        match self.url.as_deref() {
            Some(url) => cache_key(url).unwrap_or_else(|| url.to_string()),
            None => String::new(),
        }
    }
}

/// Draw the whole feed screen into `area`
pub fn render(frame: &mut Frame, area: Rect, page: &PageSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(area);

    render_title_bar(frame, chunks[0], page);
    render_page(frame, chunks[1], page);
    render_key_hints(frame, chunks[2]);
}

fn render_title_bar(frame: &mut Frame, area: Rect, page: &PageSnapshot) {
    let left = Line::from(vec![Span::styled(" tkp", Theme::title())]);
    let right = Line::from(vec![
        Span::styled(page.indicator(), Theme::dimmed()),
        Span::raw("  "),
        Span::styled("s", Theme::keybind()),
        Span::styled(" settings ", Theme::dimmed()),
    ]);

    frame.render_widget(Paragraph::new(left).style(Theme::chrome()), area);
    frame.render_widget(
        Paragraph::new(right).alignment(Alignment::Right).style(Theme::chrome()),
        area,
    );
}

fn render_page(frame: &mut Frame, area: Rect, page: &PageSnapshot) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border())
        .style(Theme::screen());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if page.is_empty() {
        let empty = Paragraph::new(EMPTY_MESSAGE)
            .style(Theme::dimmed())
            .alignment(Alignment::Center);
        frame.render_widget(empty, centered_row(inner));
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner);

    // Duration readout, top right
    let duration = Paragraph::new(Span::styled(
        format!(" {} ", page.status.duration_text()),
        Theme::badge(),
    ))
    .alignment(Alignment::Right);
    frame.render_widget(duration, rows[0]);

    render_body(frame, rows[1], page);
    render_controls(frame, rows[2], page);
}

fn render_body(frame: &mut Frame, area: Rect, page: &PageSnapshot) {
    let caption = Line::from(Span::styled(page.caption(), Theme::caption()));
    let lines = match &page.phase {
        PlaybackPhase::Loading => vec![caption, Line::from(Span::styled("Loading...", Theme::loading()))],
        PlaybackPhase::Error(msg) => vec![
            caption,
            Line::from(Span::styled(msg.clone(), Theme::error())),
            Line::from(vec![
                Span::styled("press ", Theme::dimmed()),
                Span::styled("r", Theme::keybind()),
                Span::styled(" to retry", Theme::dimmed()),
            ]),
        ],
        PlaybackPhase::Playing => vec![caption, Line::from(Span::styled("Playing in mpv", Theme::dimmed()))],
        PlaybackPhase::Paused => vec![caption, Line::from(Span::styled("Paused", Theme::dimmed()))],
        PlaybackPhase::Idle => vec![caption],
    };

    let height = lines.len() as u16;
    let body = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    let top = area.y + area.height.saturating_sub(height) / 2;
    let target = Rect::new(area.x, top, area.width, height.min(area.height));
    frame.render_widget(body, target);
}

fn render_controls(frame: &mut Frame, area: Rect, page: &PageSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(4), Constraint::Min(1)])
        .split(area);

    let glyph = if page.phase.is_playing() { "▶" } else { "❚❚" };
    frame.render_widget(
        Paragraph::new(Span::styled(format!(" {} ", glyph), Theme::control())),
        cols[0],
    );

    let gauge = Gauge::default()
        .gauge_style(Theme::progress_filled())
        .ratio(page.status.progress())
        .label("");
    frame.render_widget(gauge, cols[1]);
}

fn render_key_hints(frame: &mut Frame, area: Rect) {
    let hints = [
        ("j/k", "next/prev"),
        ("space", "play/pause"),
        ("r", "retry"),
        ("s", "settings"),
        ("q", "quit"),
    ];
    let mut spans = vec![Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(key, Theme::keybind()));
        spans.push(Span::styled(format!(" {}  ", label), Theme::dimmed()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).style(Theme::chrome()), area);
}

fn centered_row(area: Rect) -> Rect {
    Rect::new(area.x, area.y + area.height / 2, area.width, 1.min(area.height))
}
