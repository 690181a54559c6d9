//! App state and core application logic
//!
//! Maps keys to actions, owns the feed and the listing subscription, and
//! drives the settings sheet.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::DirectoryLoader;
use crate::config::ConfigStore;
use crate::feed::Feed;
use crate::ui::{PageSnapshot, SetupState};

/// How often progress of the playing page is sampled
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

// =============================================================================
// App State Enum
// =============================================================================

/// Application state enum representing current screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppState {
    /// Full-screen feed
    #[default]
    Feed,
    /// Settings sheet over the feed
    Setup,
}

// =============================================================================
// Input Mode
// =============================================================================

/// Current input mode for keyboard handling
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Text input mode (URL field focused)
    Editing,
}

// =============================================================================
// Actions
// =============================================================================

/// Something a key asked for that needs the feed or the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Next,
    Previous,
    First,
    Last,
    TogglePause,
    Retry,
    OpenSetup,
    CloseSetup,
    SaveSetup,
    Reload,
    Quit,
}

// =============================================================================
// App
// =============================================================================

/// Main application struct
pub struct App {
    /// Current screen
    pub state: AppState,
    pub input_mode: InputMode,
    /// Whether app should keep running
    pub running: bool,
    pub setup: SetupState,
    /// Error message to display
    pub error: Option<String>,
    pub feed: Feed,
    loader: Arc<DirectoryLoader>,
    videos_rx: watch::Receiver<Vec<String>>,
    config: ConfigStore,
    /// Source URL from `--source`/env, used until a URL is saved
    source_override: Option<String>,
    last_sample: Instant,
}

impl App {
    pub fn new(
        config: ConfigStore,
        feed: Feed,
        loader: Arc<DirectoryLoader>,
        source_override: Option<String>,
    ) -> Self {
        let videos_rx = loader.subscribe();
        Self {
            state: AppState::Feed,
            input_mode: InputMode::Normal,
            running: true,
            setup: SetupState::default(),
            error: None,
            feed,
            loader,
            videos_rx,
            config,
            source_override,
            last_sample: Instant::now(),
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// URL the feed is loaded from: `--source` (or `TKP_SOURCE_URL`) until
    /// the sheet is saved, the stored URL after that
    pub fn source_url(&self) -> Option<String> {
        self.source_override
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.config.config.source_url.clone())
    }

    /// Kick off the first listing load
    ///
    /// Without a configured source the settings sheet opens instead.
    pub fn start(&mut self) {
        if self.source_url().is_some() {
            self.reload();
        } else {
            self.open_setup();
        }
    }

    /// Fetch the listing again in the background
    pub fn reload(&self) {
        let url = self.source_url();
        info!(url = ?url, "reloading listing");
        self.loader.spawn_load(url);
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.error = Some(msg.into());
    }

    /// Snapshot of the page on screen for rendering
    pub fn page(&self) -> PageSnapshot {
        PageSnapshot::of(&self.feed)
    }

    /// Hand a newly published listing to the feed
    pub async fn sync_listing(&mut self) -> bool {
        if !self.videos_rx.has_changed().unwrap_or(false) {
            return false;
        }
        let videos = self.videos_rx.borrow_and_update().clone();
        self.feed.set_items(videos).await;
        true
    }

    /// Per-frame work: apply finished loads, pick up new listings and
    /// sample progress
    pub async fn tick(&mut self) {
        self.feed.process_events().await;
        self.sync_listing().await;
        if self.last_sample.elapsed() >= PROGRESS_INTERVAL {
            self.last_sample = Instant::now();
            self.feed.tick().await;
        }
    }

    fn open_setup(&mut self) {
        self.setup = SetupState::new(self.source_url().unwrap_or_default());
        self.state = AppState::Setup;
        self.input_mode = InputMode::Editing;
    }

    fn close_setup(&mut self) {
        self.state = AppState::Feed;
        self.input_mode = InputMode::Normal;
    }

    /// Persist the edited URL, reload and dismiss the sheet
    fn save_setup(&mut self) {
        self.config.config.set_source_url(self.setup.value());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "failed to save config");
            self.set_error(format!("Could not save settings: {:#}", e));
        }
        self.source_override = None;
        self.close_setup();
        self.reload();
    }

    // -------------------------------------------------------------------------
    // Keyboard Event Handling
    // -------------------------------------------------------------------------

    /// Handle keyboard event
    ///
    /// Text editing is applied directly; anything touching the feed comes
    /// back as an [`Action`] for [`App::apply`].
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        // Clear error on any keypress
        self.error = None;

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Action::Quit);
        }

        if self.input_mode == InputMode::Editing {
            self.handle_editing_key(key)
        } else {
            self.handle_feed_key(key)
        }
    }

    fn handle_editing_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => return Some(Action::CloseSetup),
            KeyCode::Enter => return Some(Action::SaveSetup),
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.setup.clear()
            }
            KeyCode::Char(c) => self.setup.insert(c),
            KeyCode::Backspace => self.setup.backspace(),
            KeyCode::Delete => self.setup.delete(),
            KeyCode::Left => self.setup.cursor_left(),
            KeyCode::Right => self.setup.cursor_right(),
            KeyCode::Home => self.setup.cursor_home(),
            KeyCode::End => self.setup.cursor_end(),
            _ => {}
        }
        None
    }

    fn handle_feed_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
            KeyCode::Char('s') => Some(Action::OpenSetup),
            KeyCode::Down | KeyCode::Char('j') | KeyCode::PageDown => Some(Action::Next),
            KeyCode::Up | KeyCode::Char('k') | KeyCode::PageUp => Some(Action::Previous),
            KeyCode::Home | KeyCode::Char('g') => Some(Action::First),
            KeyCode::End | KeyCode::Char('G') => Some(Action::Last),
            KeyCode::Char(' ') | KeyCode::Enter => Some(Action::TogglePause),
            KeyCode::Char('r') => Some(Action::Retry),
            KeyCode::Char('R') | KeyCode::F(5) => Some(Action::Reload),
            _ => None,
        }
    }

    /// Carry out an action
    pub async fn apply(&mut self, action: Action) {
        match action {
            Action::Next => {
                self.feed.next().await;
            }
            Action::Previous => {
                self.feed.previous().await;
            }
            Action::First => {
                self.feed.settle(0).await;
            }
            Action::Last => {
                let last = self.feed.len().saturating_sub(1);
                self.feed.settle(last).await;
            }
            Action::TogglePause => self.feed.toggle_pause().await,
            Action::Retry => {
                self.feed.retry();
            }
            Action::OpenSetup => self.open_setup(),
            Action::CloseSetup => self.close_setup(),
            Action::SaveSetup => self.save_setup(),
            Action::Reload => self.reload(),
            Action::Quit => self.quit(),
        }
    }

    /// Close every player before exit
    pub async fn shutdown(&mut self) {
        self.feed.shutdown().await;
    }
}
