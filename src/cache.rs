//! Local video cache
//!
//! Videos are stored in a flat directory, keyed by the last path segment of
//! their remote URL. There is no eviction and no metadata: a file that
//! exists is a cache hit. Distinct URLs sharing a file name share an entry.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Directory name under the platform cache dir
pub const CACHE_DIR_NAME: &str = "tkp_videos";

/// Errors from cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("URL has no file name to cache under: {0}")]
    NoFileName(String),
    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),
    #[error("Download returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file currently in the cache
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CacheEntry {
    pub name: String,
    pub size: u64,
}

/// Cache key for a remote URL: its last non-empty path segment, decoded
pub fn cache_key(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()?
        .to_string();
    let decoded = urlencoding::decode(&segment)
        .map(|s| s.into_owned())
        .unwrap_or(segment);

    // A decoded segment must stay a single file name
    if decoded.contains('/') || decoded.contains('\\') || decoded == "." || decoded == ".." {
        return None;
    }
    Some(decoded)
}

/// In-flight write from `write_atomic`
fn is_part_file(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(".part")
}

/// Disk cache of downloaded videos
#[derive(Debug)]
pub struct VideoCache {
    dir: PathBuf,
    client: reqwest::Client,
}

impl VideoCache {
    /// Open (creating if needed) a cache rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        Self::with_client(dir, reqwest::Client::new())
    }

    /// Open a cache that downloads through the given client
    pub fn with_client(dir: impl Into<PathBuf>, client: reqwest::Client) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, client })
    }

    /// Default location: `<platform cache dir>/tkp_videos`
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(CACHE_DIR_NAME)
    }

    /// Cache root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where `url` would be cached, whether or not it is
    pub fn path_for(&self, url: &str) -> Option<PathBuf> {
        cache_key(url).map(|name| self.dir.join(name))
    }

    /// Local file for `url` if it is already cached
    pub async fn local_path(&self, url: &str) -> Option<PathBuf> {
        let path = self.path_for(url)?;
        match tokio::fs::try_exists(&path).await {
            Ok(true) => Some(path),
            _ => None,
        }
    }

    /// Download `url` into the cache unless it is already there
    ///
    /// Returns the cached path. An existing file is never overwritten.
    pub async fn store(&self, url: &str) -> Result<PathBuf, CacheError> {
        let path = self
            .path_for(url)
            .ok_or_else(|| CacheError::NoFileName(url.to_string()))?;
        if tokio::fs::try_exists(&path).await? {
            debug!(url, path = %path.display(), "already cached");
            return Ok(path);
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::Status(status));
        }
        let data = response.bytes().await?;

        self.write_atomic(&path, &data).await?;
        info!(url, bytes = data.len(), path = %path.display(), "cached video");
        Ok(path)
    }

    /// Copy an already-downloaded file into the cache slot for `url`
    ///
    /// Same no-overwrite rule as [`VideoCache::store`].
    pub async fn import(&self, url: &str, from: &Path) -> Result<PathBuf, CacheError> {
        let path = self
            .path_for(url)
            .ok_or_else(|| CacheError::NoFileName(url.to_string()))?;
        if tokio::fs::try_exists(&path).await? {
            return Ok(path);
        }

        let data = tokio::fs::read(from).await?;
        self.write_atomic(&path, &data).await?;
        info!(url, bytes = data.len(), path = %path.display(), "cached video from temp file");
        Ok(path)
    }

    /// Write to a sibling part file, then rename into place
    async fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), CacheError> {
        let part = self.dir.join(format!(".{}.part", Uuid::new_v4()));
        tokio::fs::write(&part, data).await?;
        if let Err(e) = tokio::fs::rename(&part, path).await {
            let _ = tokio::fs::remove_file(&part).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Cached files, sorted by name (part files excluded)
    pub async fn entries(&self) -> Result<Vec<CacheEntry>, CacheError> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_part_file(&name) {
                continue;
            }
            let meta = entry.metadata().await?;
            if meta.is_file() {
                entries.push(CacheEntry {
                    name,
                    size: meta.len(),
                });
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Total bytes held by cached files
    pub async fn total_size(&self) -> Result<u64, CacheError> {
        Ok(self.entries().await?.iter().map(|e| e.size).sum())
    }

    /// Delete every cached file, returning how many were removed
    ///
    /// Part files of writes still in flight are left alone.
    pub async fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            if is_part_file(&entry.file_name().to_string_lossy()) {
                continue;
            }
            if entry.file_type().await?.is_file() {
                match tokio::fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(path = %entry.path().display(), error = %e, "failed to remove"),
                }
            }
        }
        info!(removed, dir = %self.dir.display(), "cache cleared");
        Ok(removed)
    }
}
