//! In-memory storage, transcript, leaderboard and moderation-log fakes.
//!
//! Each fake is `Clone` and shares its state between clones, so a test can
//! keep a handle after moving one into the environment or the registry.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use middleman_core::error::PlatformError;
use middleman_core::ids::{ChannelId, GuildId};
use middleman_core::model::LeaderboardKind;
use middleman_core::providers::{
    LeaderboardSink, ModLogEntry, ModerationLog, RegistryStore, Result, TranscriptFile,
    TranscriptFormat, TranscriptOptions, TranscriptRenderer,
};
use middleman_core::registry::RegistrySnapshot;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct StoreState {
    stored: Option<RegistrySnapshot>,
    saves: usize,
    failing: bool,
}

/// In-memory [`RegistryStore`].
///
/// # Example
///
/// ```
/// use middleman_testing::collaborators::InMemoryRegistryStore;
///
/// let store = InMemoryRegistryStore::new();
/// assert_eq!(store.save_count(), 0);
/// assert!(store.saved().is_none());
/// ```
#[derive(Clone, Default)]
pub struct InMemoryRegistryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryRegistryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that loads `snapshot`.
    #[must_use]
    pub fn with_snapshot(snapshot: RegistrySnapshot) -> Self {
        let store = Self::new();
        store.state.lock().unwrap().stored = Some(snapshot);
        store
    }

    /// Last saved (or seeded) snapshot.
    #[must_use]
    pub fn saved(&self) -> Option<RegistrySnapshot> {
        self.state.lock().unwrap().stored.clone()
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.state.lock().unwrap().saves
    }

    /// Make loads and saves fail.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }
}

impl RegistryStore for InMemoryRegistryStore {
    async fn load(&self) -> Result<RegistrySnapshot> {
        let state = self.state.lock().unwrap();
        if state.failing {
            return Err(PlatformError::Storage("store unavailable".into()));
        }
        Ok(state.stored.clone().unwrap_or_default())
    }

    async fn save(&self, snapshot: &RegistrySnapshot) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing {
            return Err(PlatformError::Storage("store unavailable".into()));
        }
        state.stored = Some(snapshot.clone());
        state.saves += 1;
        Ok(())
    }
}

#[derive(Default)]
struct RendererState {
    size: usize,
    failing: Vec<TranscriptFormat>,
    calls: Vec<(ChannelId, TranscriptOptions)>,
}

/// [`TranscriptRenderer`] producing a fixed-size HTML document.
#[derive(Clone)]
pub struct MockTranscriptRenderer {
    state: Arc<Mutex<RendererState>>,
}

impl Default for MockTranscriptRenderer {
    fn default() -> Self {
        Self::with_size(1024)
    }
}

impl MockTranscriptRenderer {
    /// Renderer producing 1 KiB documents.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renderer producing documents of `size` bytes.
    #[must_use]
    pub fn with_size(size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(RendererState {
                size,
                ..RendererState::default()
            })),
        }
    }

    /// Fail every render in `format`.
    pub fn fail_format(&self, format: TranscriptFormat) {
        self.state.lock().unwrap().failing.push(format);
    }

    /// Render requests, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(ChannelId, TranscriptOptions)> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl TranscriptRenderer for MockTranscriptRenderer {
    async fn create_transcript(&self, channel: ChannelId, options: TranscriptOptions) -> Result<TranscriptFile> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((channel, options.clone()));
        if state.failing.contains(&options.format) {
            return Err(PlatformError::Transport("renderer crashed".into()));
        }
        let mut data = b"<html>".to_vec();
        data.resize(state.size.max(data.len()), b' ');
        Ok(TranscriptFile {
            filename: options.filename,
            data,
        })
    }
}

#[derive(Default)]
struct LeaderboardState {
    refreshes: Vec<(LeaderboardKind, GuildId, RegistrySnapshot)>,
    failing: bool,
}

/// [`LeaderboardSink`] that records refreshes.
#[derive(Clone, Default)]
pub struct RecordingLeaderboards {
    state: Arc<Mutex<LeaderboardState>>,
}

impl RecordingLeaderboards {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Kinds refreshed, in order.
    #[must_use]
    pub fn refreshed(&self) -> Vec<LeaderboardKind> {
        self.state
            .lock()
            .unwrap()
            .refreshes
            .iter()
            .map(|(kind, _, _)| *kind)
            .collect()
    }

    /// Snapshot handed to the last refresh.
    #[must_use]
    pub fn last_snapshot(&self) -> Option<RegistrySnapshot> {
        self.state
            .lock()
            .unwrap()
            .refreshes
            .last()
            .map(|(_, _, s)| s.clone())
    }

    /// Make refreshes fail after recording them.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }
}

impl LeaderboardSink for RecordingLeaderboards {
    async fn refresh(&self, kind: LeaderboardKind, guild: GuildId, snapshot: &RegistrySnapshot) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.refreshes.push((kind, guild, snapshot.clone()));
        if state.failing {
            return Err(PlatformError::Transport("leaderboard message missing".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct ModLogState {
    entries: Vec<ModLogEntry>,
    failing: bool,
}

/// [`ModerationLog`] that records entries.
#[derive(Clone, Default)]
pub struct RecordingModLog {
    state: Arc<Mutex<ModLogState>>,
}

impl RecordingModLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<ModLogEntry> {
        self.state.lock().unwrap().entries.clone()
    }

    /// Make recording fail.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }
}

impl ModerationLog for RecordingModLog {
    async fn record(&self, entry: ModLogEntry) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing {
            return Err(PlatformError::Transport("mod log unavailable".into()));
        }
        state.entries.push(entry);
        Ok(())
    }
}
