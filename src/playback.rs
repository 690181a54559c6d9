//! Per-item playback view-model
//!
//! A `PlaybackViewModel` tracks one feed item through
//! idle → loading → playing/paused → error. The actual fetching happens in
//! [`MediaLoader`] on a background task; its result comes back to the UI
//! task and is applied with [`PlaybackViewModel::apply_loaded`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{cache_key, VideoCache};
use crate::models::{PlaybackPhase, PlaybackStatus};
use crate::stream::player::{MediaPlayer, PlayerBackend, PlayerError};

/// Errors while loading a video for playback
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid video URL '{0}'")]
    InvalidUrl(String),
    #[error("download failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("server returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("could not write temp file: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Player(#[from] PlayerError),
}

/// Where an opened player is reading from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Served from the video cache
    Cache(PathBuf),
    /// Freshly downloaded to the temp dir; cache write runs in background
    Temp(PathBuf),
}

impl MediaSource {
    pub fn path(&self) -> &Path {
        match self {
            MediaSource::Cache(p) | MediaSource::Temp(p) => p,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, MediaSource::Cache(_))
    }
}

/// A successfully opened player
pub struct LoadedMedia {
    pub player: Box<dyn MediaPlayer>,
    pub source: MediaSource,
}

impl std::fmt::Debug for LoadedMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedMedia")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Media Loader
// =============================================================================

/// Resolves a video URL to an open player: cache first, network second
pub struct MediaLoader {
    cache: Arc<VideoCache>,
    client: reqwest::Client,
    backend: Arc<dyn PlayerBackend>,
    temp_dir: PathBuf,
}

impl MediaLoader {
    pub fn new(cache: Arc<VideoCache>, backend: Arc<dyn PlayerBackend>) -> Self {
        Self {
            cache,
            client: reqwest::Client::new(),
            backend,
            temp_dir: std::env::temp_dir().join("tkp"),
        }
    }

    /// Override the directory for first-play downloads
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn cache(&self) -> &Arc<VideoCache> {
        &self.cache
    }

    /// Open a player for `url`
    ///
    /// On a cache miss the video is downloaded to the temp dir, played from
    /// there, and copied into the cache on a background task.
    pub async fn load(&self, url: &str) -> Result<LoadedMedia, LoadError> {
        if let Some(local) = self.cache.local_path(url).await {
            debug!(url, path = %local.display(), "cache hit");
            let player = self.backend.open(&local).await?;
            return Ok(LoadedMedia {
                player,
                source: MediaSource::Cache(local),
            });
        }

        let name = cache_key(url).ok_or_else(|| LoadError::InvalidUrl(url.to_string()))?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status(status));
        }
        let data = response.bytes().await?;

        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let tmp = self.temp_dir.join(&name);
        tokio::fs::write(&tmp, &data).await?;
        info!(url, bytes = data.len(), "downloaded for first play");

        let player = self.backend.open(&tmp).await?;
        self.spawn_cache_write(url, &tmp);

        Ok(LoadedMedia {
            player,
            source: MediaSource::Temp(tmp),
        })
    }

    fn spawn_cache_write(&self, url: &str, tmp: &Path) {
        let cache = Arc::clone(&self.cache);
        let url = url.to_string();
        let tmp = tmp.to_path_buf();
        tokio::spawn(async move {
            if let Err(e) = cache.import(&url, &tmp).await {
                warn!(url, error = %e, "background cache write failed");
            }
        });
    }
}

// =============================================================================
// View-Model
// =============================================================================

/// Playback state of a single feed item
pub struct PlaybackViewModel {
    url: String,
    phase: PlaybackPhase,
    player: Option<Box<dyn MediaPlayer>>,
    source: Option<MediaSource>,
    status: PlaybackStatus,
    generation: u64,
}

impl PlaybackViewModel {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            phase: PlaybackPhase::Idle,
            player: None,
            source: None,
            status: PlaybackStatus::default(),
            generation: 0,
        }
    }

    /// The originally requested URL
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn phase(&self) -> &PlaybackPhase {
        &self.phase
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_playing(&self) -> bool {
        self.phase.is_playing()
    }

    pub fn progress(&self) -> f64 {
        self.status.progress()
    }

    pub fn duration_text(&self) -> String {
        self.status.duration_text()
    }

    /// Enter loading for the saved URL; returns the load's generation
    ///
    /// Used both for the first load and for retry.
    pub fn begin_load(&mut self, generation: u64) -> u64 {
        self.phase = PlaybackPhase::Loading;
        self.generation = generation;
        self.status = PlaybackStatus::default();
        generation
    }

    /// Apply a finished load
    ///
    /// Results from an older generation are rejected and handed back so the
    /// caller can close the orphaned player.
    pub async fn apply_loaded(
        &mut self,
        generation: u64,
        result: Result<LoadedMedia, String>,
        visible: bool,
    ) -> Option<LoadedMedia> {
        if generation != self.generation || !self.phase.is_loading() {
            debug!(url = %self.url, generation, current = self.generation, "stale load result");
            return result.ok();
        }

        match result {
            Ok(media) => {
                self.player = Some(media.player);
                self.source = Some(media.source);
                self.phase = PlaybackPhase::Paused;
                if visible {
                    self.play().await;
                }
            }
            Err(msg) => {
                warn!(url = %self.url, error = %msg, "load failed");
                self.phase = PlaybackPhase::Error(msg);
            }
        }
        None
    }

    /// Resume (or start) playback; no-op without a player
    pub async fn play(&mut self) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        match player.play().await {
            Ok(()) => self.phase = PlaybackPhase::Playing,
            Err(e) => self.fail(e).await,
        }
    }

    /// Rewind and play, for an item that just became current
    pub async fn restart(&mut self) {
        if let Some(player) = self.player.as_mut() {
            if let Err(e) = player.seek_to_start().await {
                self.fail(e).await;
                return;
            }
        }
        self.play().await;
    }

    pub async fn pause(&mut self) {
        let Some(player) = self.player.as_mut() else {
            return;
        };
        match player.pause().await {
            Ok(()) => self.phase = PlaybackPhase::Paused,
            Err(e) => self.fail(e).await,
        }
    }

    pub async fn toggle_pause(&mut self) {
        if self.is_playing() {
            self.pause().await;
        } else {
            self.play().await;
        }
    }

    pub async fn set_readahead(&mut self, secs: u32) {
        if let Some(player) = self.player.as_mut() {
            if let Err(e) = player.set_readahead(secs).await {
                debug!(url = %self.url, error = %e, "readahead not applied");
            }
        }
    }

    /// Sample position and duration while playing
    pub async fn sample_progress(&mut self) {
        if !self.is_playing() {
            return;
        }
        let Some(player) = self.player.as_mut() else {
            return;
        };
        let position = player.position().await;
        let duration = player.duration().await;
        match (position, duration) {
            (Ok(position), Ok(duration)) => {
                self.status = PlaybackStatus::new(position, duration);
            }
            (Err(e), _) | (_, Err(e)) => self.fail(e).await,
        }
    }

    /// Close the player and return to idle
    pub async fn close(&mut self) {
        if let Some(mut player) = self.player.take() {
            if let Err(e) = player.close().await {
                debug!(url = %self.url, error = %e, "close failed");
            }
        }
        self.phase = PlaybackPhase::Idle;
    }

    async fn fail(&mut self, error: PlayerError) {
        warn!(url = %self.url, error = %error, "playback failed");
        if let Some(mut player) = self.player.take() {
            let _ = player.close().await;
        }
        self.phase = PlaybackPhase::Error(error.to_string());
    }
}

impl std::fmt::Debug for PlaybackViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackViewModel")
            .field("url", &self.url)
            .field("phase", &self.phase)
            .field("source", &self.source)
            .field("status", &self.status)
            .field("generation", &self.generation)
            .finish()
    }
}
