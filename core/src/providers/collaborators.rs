use super::Result;
use crate::ids::{ChannelId, GuildId, UserId};
use crate::model::LeaderboardKind;
use crate::registry::RegistrySnapshot;
use std::future::Future;

/// Whole-state persistence of the registry.
pub trait RegistryStore: Send + Sync {
    /// Load the stored snapshot. A missing store yields an empty snapshot.
    fn load(&self) -> impl Future<Output = Result<RegistrySnapshot>> + Send;

    /// Replace the stored snapshot.
    fn save(&self, snapshot: &RegistrySnapshot) -> impl Future<Output = Result<()>> + Send;
}

/// Output form of a rendered transcript.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranscriptFormat {
    /// A ready-to-upload file attachment.
    Attachment,
    /// Raw bytes, uploaded by the caller.
    Buffer,
}

/// Transcript rendering options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptOptions {
    /// Maximum messages to include; `None` for the full history.
    pub limit: Option<usize>,
    /// Output form.
    pub format: TranscriptFormat,
    /// File name of the rendered transcript.
    pub filename: String,
    /// Inline images into the document.
    pub save_images: bool,
}

impl TranscriptOptions {
    /// Full-history transcript in the given form.
    #[must_use]
    pub fn full(format: TranscriptFormat, filename: impl Into<String>) -> Self {
        Self {
            limit: None,
            format,
            filename: filename.into(),
            save_images: true,
        }
    }
}

/// A rendered transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptFile {
    /// File name.
    pub filename: String,
    /// Document bytes.
    pub data: Vec<u8>,
}

/// Renders a channel's history into a document.
pub trait TranscriptRenderer: Send + Sync {
    /// Render the transcript of `channel`.
    fn create_transcript(
        &self,
        channel: ChannelId,
        options: TranscriptOptions,
    ) -> impl Future<Output = Result<TranscriptFile>> + Send;
}

/// Refreshes a rendered leaderboard (and any derived roles) after points change.
pub trait LeaderboardSink: Send + Sync {
    /// Re-render the given leaderboard from `snapshot`.
    fn refresh(
        &self,
        kind: LeaderboardKind,
        guild: GuildId,
        snapshot: &RegistrySnapshot,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// One moderation-log entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModLogEntry {
    /// Short action title, e.g. "Ticket Thread Deleted".
    pub action: String,
    /// Body text.
    pub description: String,
    /// Sidebar colour.
    pub color: u32,
    /// Who performed the action.
    pub actor: UserId,
    /// Free-form trailing note.
    pub note: Option<String>,
}

/// Moderation log sink.
pub trait ModerationLog: Send + Sync {
    /// Record an entry.
    fn record(&self, entry: ModLogEntry) -> impl Future<Output = Result<()>> + Send;
}
