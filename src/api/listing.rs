//! Directory listing loader
//!
//! Turns a WebDAV/HTTP directory page or a JSON array of URLs into the list
//! of playable video URLs shown in the feed. JSON is tried first; anything
//! else is scraped for `<a href="...">` links ending in `.mp4` or `.mov`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

/// File suffixes recognised as videos when scraping HTML listings
pub const VIDEO_SUFFIXES: &[&str] = &[".mp4", ".mov"];

/// Errors from fetching a listing
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("Invalid listing URL '{0}'")]
    InvalidUrl(String),
    #[error("Listing request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Listing returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

fn href_regex() -> Option<&'static Regex> {
    static HREF: OnceLock<Option<Regex>> = OnceLock::new();
    HREF.get_or_init(|| Regex::new(r#"(?i)<a[^>]*href="([^"]+)""#).ok())
        .as_ref()
}

/// Resolve a listing entry against the listing URL
///
/// Entries that cannot be resolved are returned unchanged.
pub fn resolve(entry: &str, base: &Url) -> String {
    base.join(entry)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| entry.to_string())
}

/// Does this href point at a video file (case-insensitive suffix match)?
pub fn is_video_link(href: &str) -> bool {
    let lower = href.to_lowercase();
    VIDEO_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

/// Extract video URLs from a listing response body
///
/// A body that decodes as a JSON array of strings is taken as-is (every
/// entry, in order). Otherwise the body is treated as HTML.
pub fn parse_listing(body: &[u8], base: &Url) -> Vec<String> {
    if let Ok(entries) = serde_json::from_slice::<Vec<String>>(body) {
        return entries.iter().map(|e| resolve(e, base)).collect();
    }

    let html = String::from_utf8_lossy(body);
    scrape_html(&html, base)
}

/// Scrape anchor hrefs that look like videos, in document order
pub fn scrape_html(html: &str, base: &Url) -> Vec<String> {
    let Some(re) = href_regex() else {
        return Vec::new();
    };
    re.captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|href| is_video_link(href))
        .map(|href| resolve(href, base))
        .collect()
}

/// Fetches listings and publishes the discovered video list
///
/// Subscribers get the latest list through a `watch` channel; a failed
/// fetch publishes an empty list. Only the most recently started load
/// publishes; earlier ones finishing late are dropped.
pub struct DirectoryLoader {
    client: reqwest::Client,
    videos: watch::Sender<Vec<String>>,
    latest: AtomicU64,
}

impl DirectoryLoader {
    /// Create a loader with the default HTTP client
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Create a loader with a connect timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .unwrap_or_default();
        Self::with_client(client)
    }

    /// Create a loader around an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        let (videos, _) = watch::channel(Vec::new());
        Self {
            client,
            videos,
            latest: AtomicU64::new(0),
        }
    }

    /// Receiver for the published video list
    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.videos.subscribe()
    }

    /// Currently published list
    pub fn videos(&self) -> Vec<String> {
        self.videos.borrow().clone()
    }

    /// Fetch a listing and return the discovered videos without publishing
    pub async fn fetch(&self, url: &str) -> Result<Vec<String>, ListingError> {
        let base = Url::parse(url).map_err(|_| ListingError::InvalidUrl(url.to_string()))?;

        let response = self.client.get(base.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ListingError::Status(status));
        }

        let body = response.bytes().await?;
        let videos = parse_listing(&body, &base);
        debug!(url = %base, bytes = body.len(), found = videos.len(), "parsed listing");
        Ok(videos)
    }

    /// Load a listing and publish the result
    ///
    /// A missing or unparsable URL leaves the published list untouched.
    pub async fn load(&self, url: Option<&str>) {
        let ticket = self.next_ticket();
        self.load_as(ticket, url).await
    }

    /// Run `load` on a background task
    ///
    /// The load is ordered at spawn time, not when the task first runs.
    pub fn spawn_load(self: &Arc<Self>, url: Option<String>) -> tokio::task::JoinHandle<()> {
        let ticket = self.next_ticket();
        let loader = Arc::clone(self);
        tokio::spawn(async move { loader.load_as(ticket, url.as_deref()).await })
    }

    fn next_ticket(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn load_as(&self, ticket: u64, url: Option<&str>) {
        let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
            return;
        };
        if Url::parse(url).is_err() {
            warn!(url, "ignoring unparsable source URL");
            return;
        }

        let videos = match self.fetch(url).await {
            Ok(videos) => {
                info!(url, count = videos.len(), "listing loaded");
                videos
            }
            Err(e) => {
                warn!(url, error = %e, "listing fetch failed");
                Vec::new()
            }
        };

        if self.latest.load(Ordering::SeqCst) != ticket {
            debug!(url, "dropping superseded listing");
            return;
        }
        self.videos.send_replace(videos);
    }
}

impl Default for DirectoryLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://nas.local:5005/videos/").unwrap()
    }

    #[test]
    fn test_is_video_link() {
        assert!(is_video_link("clip.mp4"));
        assert!(is_video_link("CLIP.MOV"));
        assert!(is_video_link("a/b/c.Mp4"));
        assert!(!is_video_link("clip.mkv"));
        assert!(!is_video_link("clip.mp4.txt"));
        assert!(!is_video_link("../"));
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        assert_eq!(
            resolve("a.mp4", &base()),
            "http://nas.local:5005/videos/a.mp4"
        );
        assert_eq!(resolve("/root.mov", &base()), "http://nas.local:5005/root.mov");
        assert_eq!(
            resolve("https://cdn.example.com/x.mp4", &base()),
            "https://cdn.example.com/x.mp4"
        );
    }

    #[test]
    fn test_json_array_is_preferred() {
        let body = br#"["one.mp4", "sub/two.webm", "https://cdn.example.com/three"]"#;
        assert_eq!(
            parse_listing(body, &base()),
            vec![
                "http://nas.local:5005/videos/one.mp4",
                "http://nas.local:5005/videos/sub/two.webm",
                "https://cdn.example.com/three",
            ]
        );
    }

    #[test]
    fn test_json_with_non_strings_falls_back_to_html() {
        let body = br#"["one.mp4", 2]"#;
        assert!(parse_listing(body, &base()).is_empty());
    }

    #[test]
    fn test_html_scrape_filters_and_orders() {
        let html = r#"
            <html><body>
            <a href="../">Parent</a>
            <A HREF="B.MOV">B</A>
            <a class="f" href="a.mp4">a</a>
            <a href="notes.txt">notes</a>
            <a href="deep/c.mp4">c</a>
            </body></html>
        "#;
        assert_eq!(
            parse_listing(html.as_bytes(), &base()),
            vec![
                "http://nas.local:5005/videos/B.MOV",
                "http://nas.local:5005/videos/a.mp4",
                "http://nas.local:5005/videos/deep/c.mp4",
            ]
        );
    }

    #[test]
    fn test_plain_text_yields_nothing() {
        assert!(parse_listing(b"just some text", &base()).is_empty());
        assert!(parse_listing(b"", &base()).is_empty());
        assert!(parse_listing(&[0xff, 0xfe, 0x00], &base()).is_empty());
    }
}
