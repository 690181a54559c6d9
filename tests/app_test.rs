//! App tests against a mock listing server
//!
//! Drive the settings sheet through key events and check which listing the
//! feed ends up showing.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tkp::cache::VideoCache;
use tkp::cli::Cli;
use tkp::config::ConfigStore;
use tkp::playback::MediaLoader;
use tkp::stream::MpvBackend;
use tkp::{Action, App, AppState, DirectoryLoader, Feed};

const LISTING: &str = r#"["a.mp4", "b.mov"]"#;

fn app_in(dir: &Path, source: Option<String>) -> App {
    let cache = Arc::new(VideoCache::new(dir.join("cache")).unwrap());
    let backend = Arc::new(MpvBackend::with_command("tkp-no-such-player"));
    let media = MediaLoader::new(cache, backend).with_temp_dir(dir.join("tmp"));
    App::new(
        ConfigStore::open(Some(dir.join("config.toml"))),
        Feed::new(Arc::new(media)),
        Arc::new(DirectoryLoader::new()),
        source,
    )
}

fn press(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
    app.handle_key(KeyEvent::new(code, modifiers))
}

/// Replace the field contents and press Enter
async fn save_url(app: &mut App, url: &str) {
    press(app, KeyCode::Char('u'), KeyModifiers::CONTROL);
    for c in url.chars() {
        press(app, KeyCode::Char(c), KeyModifiers::empty());
    }
    let action = press(app, KeyCode::Enter, KeyModifiers::empty());
    assert_eq!(action, Some(Action::SaveSetup));
    app.apply(Action::SaveSetup).await;
}

/// Tick until the feed holds `count` pages
async fn tick_until_pages(app: &mut App, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while app.page().total != count {
            app.tick().await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("listing never reached the feed");
}

#[tokio::test]
async fn test_setup_save_loads_saved_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/ddd4/")
        .with_status(200)
        .with_body(LISTING)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(dir.path(), None);
    app.start();
    assert_eq!(app.state, AppState::Setup);

    let url = format!("{}/ddd4/", server.url());
    save_url(&mut app, &url).await;
    assert_eq!(app.state, AppState::Feed);

    tick_until_pages(&mut app, 2).await;
    mock.assert_async().await;
    assert_eq!(app.page().url, Some(format!("{}a.mp4", url)));

    app.shutdown().await;
}

#[tokio::test]
async fn test_setup_save_wins_over_source_env() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/saved/")
        .with_status(200)
        .with_body(LISTING)
        .create_async()
        .await;

    // Only test in this binary that touches the environment
    std::env::set_var("TKP_SOURCE_URL", "http://127.0.0.1:9/env/");
    let cli = Cli::parse_from(["tkp"]);
    std::env::remove_var("TKP_SOURCE_URL");
    assert_eq!(cli.source.as_deref(), Some("http://127.0.0.1:9/env/"));

    let dir = tempfile::tempdir().unwrap();
    let mut app = app_in(dir.path(), cli.source);
    app.start();
    assert_eq!(app.state, AppState::Feed);

    app.apply(Action::OpenSetup).await;
    assert_eq!(app.setup.input, "http://127.0.0.1:9/env/");

    let saved = format!("{}/saved/", server.url());
    save_url(&mut app, &saved).await;
    assert_eq!(app.source_url().as_deref(), Some(saved.as_str()));

    tick_until_pages(&mut app, 2).await;
    mock.assert_async().await;

    // The refused env fetch finishing late must not clear the feed
    tokio::time::sleep(Duration::from_millis(200)).await;
    app.tick().await;
    assert_eq!(app.page().total, 2);
    assert_eq!(app.page().url, Some(format!("{}a.mp4", saved)));

    let reopened = ConfigStore::open(Some(dir.path().join("config.toml")));
    assert_eq!(reopened.config.source_url.as_deref(), Some(saved.as_str()));

    app.shutdown().await;
}
