//! tkp - swipeable terminal feed for videos on a WebDAV/HTTP share
//!
//! Pages through the `.mp4`/`.mov` files of a directory listing one per
//! screen, plays the current one with mpv and caches what was watched.
//!
//! # Usage
//!
//! ```bash
//! # Browse the feed
//! tkp
//! tkp --source http://192.168.1.202:5005/ddd4
//!
//! # Scriptable subcommands
//! tkp scan --json
//! tkp cache ls
//! ```

use std::io::{stdout, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tkp::app::App;
use tkp::cache::VideoCache;
use tkp::cli::{Cli, Command, ExitCode, Output};
use tkp::commands;
use tkp::config::ConfigStore;
use tkp::feed::Feed;
use tkp::playback::MediaLoader;
use tkp::stream::MpvBackend;
use tkp::ui;
use tkp::DirectoryLoader;

type Tui = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.is_cli_mode() {
        // CLI mode: log to stderr, execute command and exit
        init_logging(cli.verbose, cli.quiet, LogTarget::Stderr);
        let exit_code = run_cli(cli).await;
        std::process::exit(exit_code.into());
    } else {
        // TUI mode: logs go to a file so they do not tear the screen
        let _guard = log_dir().and_then(|dir| init_logging(cli.verbose, cli.quiet, LogTarget::File(dir)));
        run_tui(cli).await
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Where log lines go
enum LogTarget {
    Stderr,
    /// `tkp.log` inside this directory
    File(PathBuf),
}

/// Directory for the TUI log file
fn log_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("tkp"))
}

/// Install the global subscriber
///
/// File logging uses a non-blocking writer; the returned guard must live
/// until exit so buffered lines are flushed.
fn init_logging(verbose: bool, quiet: bool, target: LogTarget) -> Option<WorkerGuard> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("tkp=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tkp=info,warn"))
    };
    let registry = tracing_subscriber::registry().with(filter);

    match target {
        LogTarget::File(dir) => {
            std::fs::create_dir_all(&dir).ok()?;
            let appender = tracing_appender::rolling::never(dir, "tkp.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init();
            Some(guard)
        }
        LogTarget::Stderr => {
            let _ = registry
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .try_init();
            None
        }
    }
}

// =============================================================================
// CLI Mode
// =============================================================================

/// Dispatch a subcommand; the result becomes the process exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);
    let Cli {
        command,
        source,
        config,
        ..
    } = cli;
    let mut store = ConfigStore::open(config);

    match command {
        Some(Command::Scan(mut cmd)) => {
            if cmd.url.is_none() {
                cmd.url = source;
            }
            commands::scan_cmd(cmd, &store, &output).await
        }

        Some(Command::Config(cmd)) => commands::config_cmd(cmd, &mut store, &output),

        Some(Command::Cache(cmd)) => match VideoCache::new(store.config.cache_dir()) {
            Ok(cache) => commands::cache_cmd(cmd, &cache, &output).await,
            Err(e) => output.error(format!("Cache unavailable: {}", e), ExitCode::Error),
        },

        Some(Command::Fetch(cmd)) => match VideoCache::new(store.config.cache_dir()) {
            Ok(cache) => commands::fetch_cmd(cmd, &cache, &output).await,
            Err(e) => output.error(format!("Cache unavailable: {}", e), ExitCode::Error),
        },

        None => {
            // main only routes here with a subcommand
            ExitCode::Success
        }
    }
}

// =============================================================================
// TUI Mode
// =============================================================================

/// Raw mode plus the alternate screen
fn enter_screen() -> Result<Tui> {
    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(out))?)
}

/// Undo [`enter_screen`]
fn leave_screen(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Wire the feed together from config
async fn build_app(cli: Cli) -> Result<App> {
    let store = ConfigStore::open(cli.config);
    let cache = Arc::new(VideoCache::new(store.config.cache_dir())?);
    info!(cache = %cache.dir().display(), "video cache ready");

    let backend = MpvBackend::with_command(store.config.player_command());
    let player_missing = !backend.is_available().await;

    let media = Arc::new(MediaLoader::new(cache, Arc::new(backend)));
    let feed = Feed::new(media).with_preload_secs(store.config.preload_secs());
    let listing = Arc::new(DirectoryLoader::with_timeout(store.config.connect_timeout()));
    let player = store.config.player_command().to_string();

    let mut app = App::new(store, feed, listing, cli.source);
    app.start();
    if player_missing {
        error!(player, "media player not found");
        app.set_error(format!("'{}' not found. Install mpv to play videos.", player));
    }
    Ok(app)
}

async fn run_tui(cli: Cli) -> Result<()> {
    let mut app = build_app(cli).await?;
    let mut terminal = enter_screen()?;

    let result = event_loop(&mut terminal, &mut app).await;
    app.shutdown().await;

    // Leave the alternate screen before reporting a loop error
    leave_screen(&mut terminal)?;
    result
}

/// Draw, wait up to one frame for a key, then fold in background work
async fn event_loop(terminal: &mut Tui, app: &mut App) -> Result<()> {
    const FRAME: Duration = Duration::from_millis(100);

    while app.running {
        terminal.draw(|frame| ui::draw(frame, app))?;

        if event::poll(FRAME)? {
            match event::read()? {
                // Windows also reports releases
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(action) = app.handle_key(key) {
                        app.apply(action).await;
                    }
                }
                _ => {}
            }
        }

        app.tick().await;
    }

    Ok(())
}
