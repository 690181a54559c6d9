//! CLI Command Handlers
//!
//! Implements the scriptable commands on top of the loader and cache.
//! Each handler takes CLI args and Output, returns ExitCode.

use tracing::debug;

use crate::api::DirectoryLoader;
use crate::cache::{CacheError, VideoCache};
use crate::cli::{
    validate_url, CacheCmd, CacheListing, ConfigCmd, ExitCode, FetchCmd, Output,
    ScanCmd, ScanResult,
};
use crate::config::ConfigStore;

// =============================================================================
// Scan Command
// =============================================================================

pub async fn scan_cmd(cmd: ScanCmd, store: &ConfigStore, output: &Output) -> ExitCode {
    let Some(url) = cmd.url.or_else(|| store.config.source_url.clone()) else {
        return output.error(
            "No source URL. Pass one or run `tkp config set-url <URL>`",
            ExitCode::InvalidArgs,
        );
    };
    if let Err(e) = validate_url(&url) {
        return output.error(format!("{}: {}", e, url), ExitCode::InvalidArgs);
    }

    output.info(format!("Scanning: {}", url));
    let loader = DirectoryLoader::with_timeout(store.config.connect_timeout());

    match loader.fetch(&url).await {
        Ok(mut videos) => {
            if let Some(limit) = cmd.limit {
                videos.truncate(limit);
            }
            if videos.is_empty() {
                return output.error("No videos found", ExitCode::NoVideos);
            }

            let result = ScanResult {
                source: url,
                count: videos.len(),
                videos,
            };
            if output.json {
                if let Err(e) = output.print(&result) {
                    return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                }
            } else {
                output.lines(&result.videos);
            }
            ExitCode::Success
        }
        Err(e) => output.error(format!("Scan failed: {}", e), ExitCode::NetworkError),
    }
}

// =============================================================================
// Config Command
// =============================================================================

pub fn config_cmd(cmd: ConfigCmd, store: &mut ConfigStore, output: &Output) -> ExitCode {
    match cmd {
        ConfigCmd::Show => {
            if let Err(e) = output.print(&store.config) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        ConfigCmd::Path => match store.path() {
            Some(path) => {
                output.lines([path.display()]);
                ExitCode::Success
            }
            None => output.error("Could not determine config path", ExitCode::Error),
        },
        ConfigCmd::SetUrl(set) => {
            let url = match validate_url(&set.url) {
                Ok(url) => url,
                Err(e) => return output.error(format!("{}: {}", e, set.url), ExitCode::InvalidArgs),
            };
            store.config.set_source_url(url.as_str());
            if let Err(e) = store.save() {
                return output.error(format!("Failed to save config: {:#}", e), ExitCode::Error);
            }
            output.info(format!("Source URL saved: {}", url));
            ExitCode::Success
        }
    }
}

// =============================================================================
// Cache Command
// =============================================================================

async fn list_cache(cache: &VideoCache) -> Result<CacheListing, CacheError> {
    Ok(CacheListing {
        dir: cache.dir().to_path_buf(),
        total_bytes: cache.total_size().await?,
        files: cache.entries().await?,
    })
}

pub async fn cache_cmd(cmd: CacheCmd, cache: &VideoCache, output: &Output) -> ExitCode {
    match cmd {
        CacheCmd::Path => {
            output.lines([cache.dir().display()]);
            ExitCode::Success
        }
        CacheCmd::Ls => {
            let listing = match list_cache(cache).await {
                Ok(listing) => listing,
                Err(e) => return output.error(format!("Failed to read cache: {}", e), ExitCode::Error),
            };

            if output.json {
                if let Err(e) = output.print(&listing) {
                    return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
                }
            } else {
                output.lines(listing.files.iter().map(|f| {
                    format!("{:>10}  {}", crate::models::format_size(f.size), f.name)
                }));
                output.info(format!(
                    "{} files, {}",
                    listing.files.len(),
                    crate::models::format_size(listing.total_bytes)
                ));
            }
            ExitCode::Success
        }
        CacheCmd::Clear => match cache.clear().await {
            Ok(removed) => {
                output.info(format!("Removed {} cached files", removed));
                ExitCode::Success
            }
            Err(e) => output.error(format!("Failed to clear cache: {}", e), ExitCode::Error),
        },
    }
}

// =============================================================================
// Fetch Command
// =============================================================================

pub async fn fetch_cmd(cmd: FetchCmd, cache: &VideoCache, output: &Output) -> ExitCode {
    if let Err(e) = validate_url(&cmd.url) {
        return output.error(format!("{}: {}", e, cmd.url), ExitCode::InvalidArgs);
    }

    if let Some(path) = cache.local_path(&cmd.url).await {
        debug!(url = %cmd.url, "fetch skipped, already cached");
        output.info("Already cached");
        output.lines([path.display()]);
        return ExitCode::Success;
    }

    output.info(format!("Downloading: {}", cmd.url));
    match cache.store(&cmd.url).await {
        Ok(path) => {
            output.lines([path.display()]);
            ExitCode::Success
        }
        Err(e) => output.error(format!("Download failed: {}", e), ExitCode::NetworkError),
    }
}
