//! tkp - swipeable terminal feed for videos on a WebDAV/HTTP share
//!
//! Discovers `.mp4`/`.mov` files in a directory listing (or a JSON array of
//! URLs), pages through them one per screen and plays them with mpv,
//! keeping a disk cache of everything watched.
//!
//! # Modules
//!
//! - `models` - Playback phase and progress
//! - `api` - Directory listing loader
//! - `cache` - Video cache keyed by file name
//! - `playback` - Per-item loading and playback view-model
//! - `feed` - Paging feed with play/pause/preload transitions
//! - `stream` - Media player backends
//! - `ui` - TUI components
//! - `app` - Application state and key handling

pub mod models;
pub mod api;
pub mod cache;
pub mod playback;
pub mod feed;
pub mod stream;
pub mod ui;
pub mod app;
pub mod cli;
pub mod commands;
pub mod config;

// Re-export commonly used types
pub use models::{PlaybackPhase, PlaybackStatus};

pub use api::DirectoryLoader;
pub use app::{Action, App, AppState};
pub use cache::VideoCache;
pub use feed::{Feed, FeedEvent};
pub use playback::{MediaLoader, PlaybackViewModel};
