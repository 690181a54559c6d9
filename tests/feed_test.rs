//! Paging feed tests
//!
//! Drives a feed over pre-cached files with a recording player backend and
//! checks which items play, pause, preload and close on every page settle.

mod common;

use std::path::Path;
use std::sync::Arc;

use common::{drain, RecordingBackend};
use tkp::cache::VideoCache;
use tkp::feed::{Feed, DEFAULT_PRELOAD_SECS};
use tkp::models::PlaybackPhase;
use tkp::playback::{MediaLoader, MediaSource};

const NAMES: [&str; 5] = ["a.mp4", "b.mp4", "c.mov", "d.mp4", "e.mp4"];

fn urls() -> Vec<String> {
    NAMES
        .iter()
        .map(|n| format!("http://nas.invalid/ddd4/{}", n))
        .collect()
}

/// Feed whose every item is already in the cache
fn cached_feed(dir: &Path) -> (Feed, RecordingBackend) {
    let cache_dir = dir.join("cache");
    std::fs::create_dir_all(&cache_dir).unwrap();
    for name in NAMES {
        std::fs::write(cache_dir.join(name), b"video").unwrap();
    }

    let backend = RecordingBackend::new();
    let cache = Arc::new(VideoCache::new(cache_dir).unwrap());
    let loader = MediaLoader::new(cache, Arc::new(backend.clone())).with_temp_dir(dir.join("tmp"));
    (Feed::new(Arc::new(loader)), backend)
}

#[tokio::test]
async fn test_first_page_plays_and_next_preloads() {
    let dir = tempfile::tempdir().unwrap();
    let (mut feed, backend) = cached_feed(dir.path());

    feed.set_items(urls()).await;
    assert_eq!(feed.current(), 0);
    assert!(feed.current_item().unwrap().phase().is_loading());
    drain(&mut feed, 2).await;

    assert_eq!(backend.playing(), vec!["a.mp4"]);
    let next = backend.last("b.mp4").unwrap();
    assert!(!next.playing);
    assert_eq!(next.readahead, Some(DEFAULT_PRELOAD_SECS));
    assert_eq!(feed.item(1).unwrap().phase(), &PlaybackPhase::Paused);
    assert_eq!(
        feed.current_item().unwrap().source(),
        Some(&MediaSource::Cache(dir.path().join("cache").join("a.mp4")))
    );
}

#[tokio::test]
async fn test_settle_plays_exactly_that_page() {
    let dir = tempfile::tempdir().unwrap();
    let (mut feed, backend) = cached_feed(dir.path());

    feed.set_items(urls()).await;
    drain(&mut feed, 2).await;

    assert!(feed.settle(3).await);
    drain(&mut feed, 2).await;

    assert_eq!(feed.current(), 3);
    assert_eq!(backend.playing(), vec!["d.mp4"]);
    assert_eq!(backend.open(), vec!["d.mp4", "e.mp4"]);
    assert_eq!(feed.live_indices(), vec![3, 4]);
    assert!(feed.item(0).is_none());
}

#[tokio::test]
async fn test_next_reuses_preloaded_player() {
    let dir = tempfile::tempdir().unwrap();
    let (mut feed, backend) = cached_feed(dir.path());

    feed.set_items(urls()).await;
    drain(&mut feed, 2).await;

    assert!(feed.next().await);
    // b was already open: rewound and played without a new player
    let b = backend.last("b.mp4").unwrap();
    assert_eq!(backend.opened_count("b.mp4"), 1);
    assert_eq!(b.seeks, 1);
    assert!(b.playing);
    assert!(backend.last("a.mp4").unwrap().closed);

    drain(&mut feed, 1).await;
    let c = backend.last("c.mov").unwrap();
    assert!(!c.playing);
    assert_eq!(c.readahead, Some(DEFAULT_PRELOAD_SECS));
    assert_eq!(backend.playing(), vec!["b.mp4"]);
}

#[tokio::test]
async fn test_going_back_recreates_view_model() {
    let dir = tempfile::tempdir().unwrap();
    let (mut feed, backend) = cached_feed(dir.path());

    feed.set_items(urls()).await;
    drain(&mut feed, 2).await;
    feed.settle(2).await;
    drain(&mut feed, 2).await;

    assert!(feed.previous().await);
    assert_eq!(feed.current(), 1);
    drain(&mut feed, 1).await;

    assert_eq!(backend.opened_count("b.mp4"), 2);
    assert_eq!(backend.playing(), vec!["b.mp4"]);
    // c stays as the preloaded neighbour
    let c = backend.last("c.mov").unwrap();
    assert!(!c.closed);
    assert!(!c.playing);
}

#[tokio::test]
async fn test_settle_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let (mut feed, backend) = cached_feed(dir.path());

    assert!(!feed.settle(2).await);
    assert!(!feed.next().await);

    feed.set_items(urls()).await;
    drain(&mut feed, 2).await;

    assert!(!feed.previous().await);
    assert!(!feed.settle(0).await);

    assert!(feed.settle(99).await);
    assert_eq!(feed.current(), 4);
    drain(&mut feed, 1).await;
    assert_eq!(backend.playing(), vec!["e.mp4"]);
    assert_eq!(feed.live_indices(), vec![4]);
    assert!(!feed.next().await);
}

#[tokio::test]
async fn test_stale_loads_are_closed() {
    let dir = tempfile::tempdir().unwrap();
    let (mut feed, backend) = cached_feed(dir.path());

    feed.set_items(urls()).await;
    // Jump away before the first two loads come back
    feed.settle(3).await;
    drain(&mut feed, 4).await;

    assert!(backend.records().iter().filter(|r| r.name == "a.mp4" || r.name == "b.mp4").all(|r| r.closed));
    assert_eq!(backend.playing(), vec!["d.mp4"]);
    assert_eq!(backend.open(), vec!["d.mp4", "e.mp4"]);
}

#[tokio::test]
async fn test_identical_list_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let (mut feed, backend) = cached_feed(dir.path());

    feed.set_items(urls()).await;
    drain(&mut feed, 2).await;
    feed.set_items(urls()).await;
    assert_eq!(feed.process_events().await, 0);
    assert_eq!(backend.records().len(), 2);

    let mut shorter = urls();
    shorter.truncate(1);
    feed.set_items(shorter).await;
    drain(&mut feed, 1).await;
    assert_eq!(feed.len(), 1);
    assert_eq!(backend.open(), vec!["a.mp4"]);
    assert_eq!(backend.opened_count("a.mp4"), 2);
}

#[tokio::test]
async fn test_toggle_pause_and_progress() {
    let dir = tempfile::tempdir().unwrap();
    let (mut feed, backend) = cached_feed(dir.path());
    backend.set_timing(Some(3.0), Some(12.0));

    feed.set_items(urls()).await;
    drain(&mut feed, 2).await;

    feed.tick().await;
    let vm = feed.current_item().unwrap();
    assert!((vm.progress() - 0.25).abs() < f64::EPSILON);
    assert_eq!(vm.duration_text(), "00:03 / 00:12");

    feed.toggle_pause().await;
    assert!(backend.playing().is_empty());
    assert_eq!(feed.current_item().unwrap().phase(), &PlaybackPhase::Paused);

    // No sampling while paused
    backend.set_timing(Some(6.0), Some(12.0));
    feed.tick().await;
    assert!((feed.current_item().unwrap().progress() - 0.25).abs() < f64::EPSILON);

    feed.toggle_pause().await;
    assert_eq!(backend.playing(), vec!["a.mp4"]);
}

#[tokio::test]
async fn test_unknown_duration_gives_zero_progress() {
    let dir = tempfile::tempdir().unwrap();
    let (mut feed, backend) = cached_feed(dir.path());
    backend.set_timing(Some(3.0), None);

    feed.set_items(urls()).await;
    drain(&mut feed, 2).await;
    feed.tick().await;

    let vm = feed.current_item().unwrap();
    assert_eq!(vm.progress(), 0.0);
    assert_eq!(vm.duration_text(), "--:--");
}

#[tokio::test]
async fn test_index_is_published() {
    let dir = tempfile::tempdir().unwrap();
    let (mut feed, _backend) = cached_feed(dir.path());
    let mut index = feed.subscribe_index();

    feed.set_items(urls()).await;
    feed.settle(2).await;
    assert!(index.has_changed().unwrap());
    assert_eq!(*index.borrow_and_update(), 2);

    feed.shutdown().await;
}

#[tokio::test]
async fn test_retry_reloads_original_url() {
    let mut server = mockito::Server::new_async().await;
    let failing = server
        .mock("GET", "/ddd4/clip.mp4")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let backend = RecordingBackend::new();
    let cache = Arc::new(VideoCache::new(dir.path().join("cache")).unwrap());
    let loader = MediaLoader::new(cache, Arc::new(backend.clone())).with_temp_dir(dir.path().join("tmp"));
    let mut feed = Feed::new(Arc::new(loader));

    feed.set_items(vec![format!("{}/ddd4/clip.mp4", server.url())]).await;
    drain(&mut feed, 1).await;
    assert!(feed.current_item().unwrap().phase().is_error());
    assert!(backend.records().is_empty());
    failing.assert_async().await;
    failing.remove_async().await;

    let ok = server
        .mock("GET", "/ddd4/clip.mp4")
        .with_status(200)
        .with_body("video-bytes")
        .expect(1)
        .create_async()
        .await;

    assert!(feed.retry());
    assert!(feed.current_item().unwrap().phase().is_loading());
    drain(&mut feed, 1).await;

    ok.assert_async().await;
    assert_eq!(backend.playing(), vec!["clip.mp4"]);
    assert!(!feed.retry());
}
