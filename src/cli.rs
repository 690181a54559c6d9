//! CLI - Command Line Interface for tkp
//!
//! Every non-interactive action is scriptable. Output is JSON when asked
//! for (or when stdout is not a terminal).
//!
//! # Examples
//!
//! ```bash
//! # Launch the feed
//! tkp
//! tkp --source http://192.168.1.202:5005/ddd4
//!
//! # Scriptable bits
//! tkp scan http://192.168.1.202:5005/ddd4 --json
//! tkp config set-url http://192.168.1.202:5005/ddd4
//! tkp cache ls
//! tkp fetch http://192.168.1.202:5005/ddd4/clip.mp4
//! ```

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;
use url::Url;

use crate::cache::CacheEntry;

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit status for scripted use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Anything not covered below (I/O, config, serialization)
    Error = 1,
    /// Bad URL or flag value
    InvalidArgs = 2,
    /// Listing or video could not be fetched
    NetworkError = 3,
    /// Listing had no videos
    NoVideos = 4,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// tkp - swipeable terminal feed for videos on a WebDAV/HTTP share
///
/// Run without arguments to launch the interactive feed.
/// Use subcommands for scriptable automation.
#[derive(Parser, Debug)]
#[command(
    name = "tkp",
    version,
    about = "Swipeable terminal video feed for WebDAV/HTTP shares",
    long_about = "Browses a WebDAV/HTTP directory listing (or a JSON array of URLs), \
                  shows every .mp4/.mov as a full-screen page and plays it with mpv, \
                  caching downloads on disk.\n\n\
                  Run without arguments to launch the interactive feed.\n\
                  Use subcommands for automation and scripting.",
    after_help = "EXAMPLES:\n\
                  tkp                                      Launch the feed\n\
                  tkp scan http://nas:5005/videos          List discovered videos\n\
                  tkp config set-url http://nas:5005/v     Save the source URL\n\
                  tkp cache ls --json                      Show cached files"
)]
pub struct Cli {
    /// JSON output (implied when stdout is not a terminal)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Only print results and errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Config file to use instead of ~/.config/tkp/config.toml
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Source URL for this run (overrides the saved one)
    #[arg(long, short = 'u', env = "TKP_SOURCE_URL")]
    pub source: Option<String>,

    /// Without a subcommand the feed starts
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// A subcommand was given
    pub fn is_cli_mode(&self) -> bool {
        self.command.is_some()
    }

    /// JSON requested or stdout is piped
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a listing and print the videos it contains
    #[command(visible_alias = "ls")]
    Scan(ScanCmd),

    /// Show or change saved settings
    #[command(subcommand)]
    Config(ConfigCmd),

    /// Inspect or clear the video cache
    #[command(subcommand)]
    Cache(CacheCmd),

    /// Download a video into the cache
    #[command(visible_alias = "dl")]
    Fetch(FetchCmd),
}

/// Fetch a listing and print discovered video URLs
#[derive(Args, Debug)]
pub struct ScanCmd {
    /// Listing URL (defaults to the saved source URL)
    pub url: Option<String>,

    /// Stop after this many videos
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCmd {
    /// Print the current configuration
    Show,
    /// Print the config file location
    Path,
    /// Save the source URL
    SetUrl(SetUrlCmd),
}

#[derive(Args, Debug)]
pub struct SetUrlCmd {
    /// WebDAV/HTTP listing URL
    #[arg(required = true)]
    pub url: String,
}

#[derive(Subcommand, Debug)]
pub enum CacheCmd {
    /// Print the cache directory
    Path,
    /// List cached files
    Ls,
    /// Delete all cached files
    Clear,
}

#[derive(Args, Debug)]
pub struct FetchCmd {
    /// Video URL
    #[arg(required = true)]
    pub url: String,
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Envelope for every JSON reply: `{"ok": true, "data": ...}` or
/// `{"ok": false, "error": "...", "code": 3}`
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }
}

impl Envelope<()> {
    pub fn failure(msg: impl Into<String>, code: ExitCode) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
            code: Some(code.into()),
        }
    }
}

/// `tkp scan` reply
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanResult {
    pub source: String,
    pub count: usize,
    pub videos: Vec<String>,
}

/// `tkp cache ls` reply
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheListing {
    pub dir: PathBuf,
    pub total_bytes: u64,
    pub files: Vec<CacheEntry>,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Where command results and diagnostics go
///
/// Results go to stdout (enveloped in JSON mode). Diagnostics go to stderr
/// and are dropped in quiet mode, except JSON errors.
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print a structured result
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        let text = if self.json {
            serde_json::to_string_pretty(&Envelope::ok(data))?
        } else {
            serde_json::to_string_pretty(&data)?
        };
        println!("{}", text);
        Ok(())
    }

    /// Print one result per line
    pub fn lines<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: std::fmt::Display,
    {
        for line in lines {
            println!("{}", line);
        }
    }

    /// Report a failure and hand back its exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            match serde_json::to_string_pretty(&Envelope::failure(msg.as_str(), code)) {
                Ok(text) => eprintln!("{}", text),
                Err(_) => eprintln!("{}", msg),
            }
        } else if !self.quiet {
            eprintln!("tkp: {}", msg);
        }
        code
    }

    /// Progress note for humans
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !(self.quiet || self.json) {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// URL Validation
// =============================================================================

/// Validate a source/video URL (absolute http or https)
pub fn validate_url(url: &str) -> Result<Url, &'static str> {
    let parsed = Url::parse(url.trim()).map_err(|_| "Invalid URL")?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err("URL must use http or https"),
    }
}
