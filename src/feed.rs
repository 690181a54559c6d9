//! Vertical paging feed
//!
//! One video per page. Settling on a page pauses whatever was current,
//! rewinds and plays the new page, and preloads the page after it. Only the
//! current page and its successor keep live view-models; everything else is
//! closed and rebuilt on reappearance.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::models::PlaybackPhase;
use crate::playback::{LoadedMedia, MediaLoader, PlaybackViewModel};

/// Default forward buffer for the preloaded next page, in seconds
pub const DEFAULT_PRELOAD_SECS: u32 = 5;

/// Result of a background task, applied on the UI task
#[derive(Debug)]
pub enum FeedEvent {
    Loaded {
        index: usize,
        generation: u64,
        result: Result<LoadedMedia, String>,
    },
}

/// The paging feed and its live view-models
pub struct Feed {
    items: Vec<String>,
    current: usize,
    slots: BTreeMap<usize, PlaybackViewModel>,
    loader: Arc<MediaLoader>,
    preload_secs: u32,
    next_generation: u64,
    index_tx: watch::Sender<usize>,
    events_tx: mpsc::UnboundedSender<FeedEvent>,
    events_rx: mpsc::UnboundedReceiver<FeedEvent>,
}

impl Feed {
    pub fn new(loader: Arc<MediaLoader>) -> Self {
        let (index_tx, _) = watch::channel(0);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            items: Vec::new(),
            current: 0,
            slots: BTreeMap::new(),
            loader,
            preload_secs: DEFAULT_PRELOAD_SECS,
            next_generation: 1,
            index_tx,
            events_tx,
            events_rx,
        }
    }

    pub fn with_preload_secs(mut self, secs: u32) -> Self {
        self.preload_secs = secs;
        self
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Index of the page on screen
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_url(&self) -> Option<&str> {
        self.items.get(self.current).map(String::as_str)
    }

    /// View-model of the page on screen
    pub fn current_item(&self) -> Option<&PlaybackViewModel> {
        self.slots.get(&self.current)
    }

    pub fn item(&self, index: usize) -> Option<&PlaybackViewModel> {
        self.slots.get(&index)
    }

    /// Indices that currently hold a view-model
    pub fn live_indices(&self) -> Vec<usize> {
        self.slots.keys().copied().collect()
    }

    /// Page index changes, for page indicators
    pub fn subscribe_index(&self) -> watch::Receiver<usize> {
        self.index_tx.subscribe()
    }

    /// Replace the feed's list
    ///
    /// An identical list is ignored. Otherwise every player is closed and the
    /// feed restarts at page 0.
    pub async fn set_items(&mut self, items: Vec<String>) {
        if items == self.items {
            return;
        }
        info!(count = items.len(), "feed list replaced");

        let slots = std::mem::take(&mut self.slots);
        for (_, mut vm) in slots {
            vm.close().await;
        }

        self.items = items;
        self.current = 0;
        self.index_tx.send_replace(0);

        if !self.items.is_empty() {
            self.activate(0).await;
            self.preload(1).await;
        }
    }

    /// Settle on page `index` (clamped to the list)
    ///
    /// Returns true if the page changed.
    pub async fn settle(&mut self, index: usize) -> bool {
        if self.items.is_empty() {
            return false;
        }
        let index = index.min(self.items.len() - 1);
        if index == self.current && self.slots.contains_key(&index) {
            return false;
        }

        debug!(from = self.current, to = index, "page settled");
        self.current = index;
        self.index_tx.send_replace(index);

        let stale: Vec<usize> = self
            .slots
            .keys()
            .copied()
            .filter(|&i| i != index && i != index + 1)
            .collect();
        for i in stale {
            if let Some(mut vm) = self.slots.remove(&i) {
                vm.close().await;
            }
        }

        for (&i, vm) in self.slots.iter_mut() {
            if i != index && vm.is_playing() {
                vm.pause().await;
            }
        }

        self.activate(index).await;
        self.preload(index + 1).await;
        true
    }

    pub async fn next(&mut self) -> bool {
        self.settle(self.current + 1).await
    }

    pub async fn previous(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.settle(self.current - 1).await
    }

    /// Play/pause the page on screen
    pub async fn toggle_pause(&mut self) {
        if let Some(vm) = self.slots.get_mut(&self.current) {
            vm.toggle_pause().await;
        }
    }

    /// Retry a failed load of the page on screen, with its original URL
    pub fn retry(&mut self) -> bool {
        let index = self.current;
        let failed = self
            .slots
            .get(&index)
            .is_some_and(|vm| vm.phase().is_error());
        if failed {
            self.start_load(index);
        }
        failed
    }

    /// Periodic work: sample progress of the page on screen
    pub async fn tick(&mut self) {
        if let Some(vm) = self.slots.get_mut(&self.current) {
            vm.sample_progress().await;
        }
    }

    /// Apply every finished background load; returns how many were applied
    pub async fn process_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event).await;
            applied += 1;
        }
        applied
    }

    /// Wait for the next background result and apply it
    pub async fn wait_event(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.apply(event).await;
                true
            }
            None => false,
        }
    }

    /// Close every player
    pub async fn shutdown(&mut self) {
        let slots = std::mem::take(&mut self.slots);
        for (_, mut vm) in slots {
            vm.close().await;
        }
    }

    async fn apply(&mut self, event: FeedEvent) {
        let FeedEvent::Loaded {
            index,
            generation,
            result,
        } = event;
        let visible = index == self.current;
        let preload_secs = self.preload_secs;

        let orphan = match self.slots.get_mut(&index) {
            Some(vm) => {
                let orphan = vm.apply_loaded(generation, result, visible).await;
                if orphan.is_none() && !visible && vm.phase().has_player() {
                    vm.set_readahead(preload_secs).await;
                }
                orphan
            }
            None => result.ok(),
        };

        if let Some(mut media) = orphan {
            debug!(index, generation, "closing player from stale load");
            let _ = media.player.close().await;
        }
    }

    /// Make `index` the playing page, loading it if needed
    async fn activate(&mut self, index: usize) {
        let Some(url) = self.items.get(index).cloned() else {
            return;
        };
        let vm = self
            .slots
            .entry(index)
            .or_insert_with(|| PlaybackViewModel::new(url));

        match vm.phase().clone() {
            PlaybackPhase::Idle => self.start_load(index),
            PlaybackPhase::Playing | PlaybackPhase::Paused => vm.restart().await,
            PlaybackPhase::Loading | PlaybackPhase::Error(_) => {}
        }
    }

    /// Start buffering `index` without playing it
    async fn preload(&mut self, index: usize) {
        let Some(url) = self.items.get(index).cloned() else {
            return;
        };
        let preload_secs = self.preload_secs;
        let vm = self
            .slots
            .entry(index)
            .or_insert_with(|| PlaybackViewModel::new(url));

        match vm.phase().clone() {
            PlaybackPhase::Idle => self.start_load(index),
            PlaybackPhase::Playing => {
                vm.pause().await;
                vm.set_readahead(preload_secs).await;
            }
            PlaybackPhase::Paused => vm.set_readahead(preload_secs).await,
            PlaybackPhase::Loading | PlaybackPhase::Error(_) => {}
        }
    }

    fn start_load(&mut self, index: usize) {
        let generation = self.next_generation;
        self.next_generation += 1;

        let Some(vm) = self.slots.get_mut(&index) else {
            return;
        };
        vm.begin_load(generation);
        let url = vm.url().to_string();

        let loader = Arc::clone(&self.loader);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = loader.load(&url).await.map_err(|e| e.to_string());
            let _ = tx.send(FeedEvent::Loaded {
                index,
                generation,
                result,
            });
        });
    }
}
