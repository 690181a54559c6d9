//! Terminal UI components
//!
//! Built with ratatui. Keys stand in for swipes and taps.

pub mod theme;
pub mod feed;
pub mod setup;

use ratatui::{
    layout::{Alignment, Rect},
    text::Span,
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, AppState};

pub use feed::PageSnapshot;
pub use setup::SetupState;
pub use theme::Theme;

/// Draw one frame: the feed, then the settings sheet and error overlay
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();
    frame.render_widget(Clear, area);
    frame.render_widget(Block::default().style(Theme::screen()), area);

    feed::render(frame, area, &app.page());

    if app.state == AppState::Setup {
        setup::render(frame, area, &app.setup);
    }
    if let Some(msg) = app.error.as_deref() {
        render_error(frame, area, msg);
    }
}

/// Error box; any key dismisses it
fn render_error(frame: &mut Frame, area: Rect, msg: &str) {
    let popup = centered_rect(area, 60, 5);
    frame.render_widget(Clear, popup);

    let body = Paragraph::new(Span::styled(msg, Theme::error()))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(Span::styled(" Error ", Theme::error()))
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Theme::error())
                .style(Theme::chrome()),
        );
    frame.render_widget(body, popup);
}

/// Rect `percent_x` wide and `height` rows tall, centered in `area`
pub(crate) fn centered_rect(area: Rect, percent_x: u16, height: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x) / 100) as u16;
    let width = width.max(20).min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
