//! Core data models for tkp
//!
//! A video reference is just its resolved absolute URL (`String`); the
//! types here describe the transient playback state of one feed item.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Playback Phase
// =============================================================================

/// Lifecycle of a single feed item's player
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "message")]
pub enum PlaybackPhase {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Fetching from cache or network, opening the player
    Loading,
    Playing,
    Paused,
    /// Load or playback failed; retry re-enters `Loading`
    Error(String),
}

impl PlaybackPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, PlaybackPhase::Loading)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackPhase::Playing)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PlaybackPhase::Error(_))
    }

    /// Player is open (playing or paused)
    pub fn has_player(&self) -> bool {
        matches!(self, PlaybackPhase::Playing | PlaybackPhase::Paused)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            PlaybackPhase::Error(msg) => Some(msg),
            _ => None,
        }
    }
}

impl fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackPhase::Idle => write!(f, "Idle"),
            PlaybackPhase::Loading => write!(f, "Loading..."),
            PlaybackPhase::Playing => write!(f, "▶ Playing"),
            PlaybackPhase::Paused => write!(f, "⏸ Paused"),
            PlaybackPhase::Error(e) => write!(f, "Load failed: {}", e),
        }
    }
}

// =============================================================================
// Playback Status
// =============================================================================

/// Sampled position/duration of an open player, in seconds
///
/// `duration` is `None` (or non-finite) for live or not-yet-loaded media.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub position: Option<f64>,
    pub duration: Option<f64>,
}

impl PlaybackStatus {
    pub fn new(position: Option<f64>, duration: Option<f64>) -> Self {
        Self { position, duration }
    }

    /// Duration if it is known and finite
    pub fn known_duration(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Progress as a fraction of total duration (0.0 - 1.0)
    ///
    /// Zero while the duration is unknown.
    pub fn progress(&self) -> f64 {
        match self.known_duration() {
            Some(dur) => (self.position.unwrap_or(0.0) / dur).clamp(0.0, 1.0),
            None => 0.0,
        }
    }

    /// "MM:SS / MM:SS" readout, or "--:--" when the duration is unknown
    pub fn duration_text(&self) -> String {
        let Some(dur) = self.known_duration() else {
            return "--:--".to_string();
        };
        let current = self
            .position
            .filter(|p| p.is_finite() && *p >= 0.0)
            .unwrap_or(0.0);
        format!("{} / {}", format_clock(current), format_clock(dur))
    }
}

/// Format seconds as MM:SS (minutes are not wrapped into hours)
pub fn format_clock(seconds: f64) -> String {
    let total = seconds as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Human-readable byte size
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.1} GB", b / GB)
    } else if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_text_unknown() {
        assert_eq!(PlaybackStatus::default().duration_text(), "--:--");
        assert_eq!(
            PlaybackStatus::new(Some(3.0), Some(f64::INFINITY)).duration_text(),
            "--:--"
        );
        assert_eq!(
            PlaybackStatus::new(Some(3.0), Some(f64::NAN)).duration_text(),
            "--:--"
        );
    }

    #[test]
    fn test_duration_text_known() {
        let status = PlaybackStatus::new(Some(65.4), Some(3725.0));
        assert_eq!(status.duration_text(), "01:05 / 62:05");
    }

    #[test]
    fn test_progress() {
        assert_eq!(PlaybackStatus::new(Some(5.0), Some(20.0)).progress(), 0.25);
        assert_eq!(PlaybackStatus::new(Some(5.0), None).progress(), 0.0);
        assert_eq!(PlaybackStatus::new(None, Some(20.0)).progress(), 0.0);
        assert_eq!(PlaybackStatus::new(Some(30.0), Some(20.0)).progress(), 1.0);
    }

    #[test]
    fn test_phase_helpers() {
        assert!(PlaybackPhase::Playing.has_player());
        assert!(PlaybackPhase::Paused.has_player());
        assert!(!PlaybackPhase::Loading.has_player());
        assert_eq!(
            PlaybackPhase::Error("boom".into()).error_message(),
            Some("boom")
        );
        assert_eq!(PlaybackPhase::default(), PlaybackPhase::Idle);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
