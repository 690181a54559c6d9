//! Shared test doubles
//!
//! `RecordingBackend` hands out fake players that remember every call, so
//! tests can assert which feed items were opened, played, paused or closed.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tkp::feed::Feed;
use tkp::stream::{MediaPlayer, PlayerBackend, PlayerError};

/// What happened to one opened player
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerRecord {
    /// File name the player was opened on
    pub name: String,
    pub playing: bool,
    pub closed: bool,
    pub plays: usize,
    pub pauses: usize,
    pub seeks: usize,
    pub readahead: Option<u32>,
}

#[derive(Clone, Default)]
pub struct RecordingBackend {
    players: Arc<Mutex<Vec<PlayerRecord>>>,
    timing: Arc<Mutex<(Option<f64>, Option<f64>)>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position and duration every player reports
    pub fn set_timing(&self, position: Option<f64>, duration: Option<f64>) {
        *self.timing.lock().unwrap() = (position, duration);
    }

    pub fn records(&self) -> Vec<PlayerRecord> {
        self.players.lock().unwrap().clone()
    }

    /// Names of open players that are currently playing
    pub fn playing(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.playing && !r.closed)
            .map(|r| r.name)
            .collect()
    }

    /// Sorted names of players not yet closed
    ///
    /// Loads finish in any order, so open order is not meaningful.
    pub fn open(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .records()
            .into_iter()
            .filter(|r| !r.closed)
            .map(|r| r.name)
            .collect();
        names.sort();
        names
    }

    pub fn opened_count(&self, name: &str) -> usize {
        self.records().iter().filter(|r| r.name == name).count()
    }

    /// Latest record for `name`
    pub fn last(&self, name: &str) -> Option<PlayerRecord> {
        self.records().into_iter().rev().find(|r| r.name == name)
    }
}

#[async_trait]
impl PlayerBackend for RecordingBackend {
    async fn open(&self, path: &Path) -> Result<Box<dyn MediaPlayer>, PlayerError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut players = self.players.lock().unwrap();
        players.push(PlayerRecord {
            name,
            ..Default::default()
        });
        Ok(Box::new(FakePlayer {
            index: players.len() - 1,
            players: Arc::clone(&self.players),
            timing: Arc::clone(&self.timing),
        }))
    }
}

struct FakePlayer {
    index: usize,
    players: Arc<Mutex<Vec<PlayerRecord>>>,
    timing: Arc<Mutex<(Option<f64>, Option<f64>)>>,
}

impl FakePlayer {
    fn update(&self, f: impl FnOnce(&mut PlayerRecord)) -> Result<(), PlayerError> {
        let mut players = self.players.lock().unwrap();
        let record = &mut players[self.index];
        if record.closed {
            return Err(PlayerError::Exited);
        }
        f(record);
        Ok(())
    }
}

#[async_trait]
impl MediaPlayer for FakePlayer {
    async fn play(&mut self) -> Result<(), PlayerError> {
        self.update(|r| {
            r.playing = true;
            r.plays += 1;
        })
    }

    async fn pause(&mut self) -> Result<(), PlayerError> {
        self.update(|r| {
            r.playing = false;
            r.pauses += 1;
        })
    }

    async fn seek_to_start(&mut self) -> Result<(), PlayerError> {
        self.update(|r| r.seeks += 1)
    }

    async fn position(&mut self) -> Result<Option<f64>, PlayerError> {
        Ok(self.timing.lock().unwrap().0)
    }

    async fn duration(&mut self) -> Result<Option<f64>, PlayerError> {
        Ok(self.timing.lock().unwrap().1)
    }

    async fn set_readahead(&mut self, secs: u32) -> Result<(), PlayerError> {
        self.update(|r| r.readahead = Some(secs))
    }

    async fn close(&mut self) -> Result<(), PlayerError> {
        let mut players = self.players.lock().unwrap();
        let record = &mut players[self.index];
        record.playing = false;
        record.closed = true;
        Ok(())
    }
}

/// Apply `n` background results, failing the test if they take too long
pub async fn drain(feed: &mut Feed, n: usize) {
    for _ in 0..n {
        let applied = tokio::time::timeout(Duration::from_secs(5), feed.wait_event())
            .await
            .expect("timed out waiting for a load");
        assert!(applied, "event channel closed");
    }
}
