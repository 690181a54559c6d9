//! Playback infrastructure
//!
//! - Player: the `MediaPlayer`/`PlayerBackend` seam and the mpv backend

pub mod player;

pub use player::{MediaPlayer, MpvBackend, PlayerBackend, PlayerError};
