//! Injected collaborators.

use middleman_core::environment::Clock;
use middleman_core::providers::{
    ChatPlatform, LeaderboardSink, ModerationLog, RegistryStore, TranscriptRenderer,
};

/// Everything the ticket service talks to.
///
/// Production wires real adapters; tests use the fakes from
/// `middleman-testing`.
pub trait Environment: Send + Sync {
    /// Chat platform client.
    type Platform: ChatPlatform;
    /// Registry persistence.
    type Store: RegistryStore;
    /// Transcript renderer.
    type Transcripts: TranscriptRenderer;
    /// Leaderboard display.
    type Leaderboards: LeaderboardSink;
    /// Moderation log.
    type ModLog: ModerationLog;
    /// Time source.
    type Clock: Clock;

    /// Chat platform client.
    fn platform(&self) -> &Self::Platform;
    /// Transcript renderer.
    fn transcripts(&self) -> &Self::Transcripts;
    /// Leaderboard display.
    fn leaderboards(&self) -> &Self::Leaderboards;
    /// Moderation log.
    fn mod_log(&self) -> &Self::ModLog;
    /// Time source.
    fn clock(&self) -> &Self::Clock;
}
