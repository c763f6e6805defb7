//! Collaborator interfaces.
//!
//! The ticket core never talks to the chat platform, the disk or any renderer
//! directly. Everything goes through the traits in this module so the runtime
//! can be driven by the in-memory fakes in `middleman-testing`.
//!
//! All methods return `impl Future + Send`; implementations are free to use
//! `async fn`.

mod collaborators;
mod interaction;
mod platform;

pub use collaborators::{
    LeaderboardSink, ModLogEntry, ModerationLog, RegistryStore, TranscriptFile, TranscriptFormat,
    TranscriptOptions, TranscriptRenderer,
};
pub use interaction::{Interaction, InteractionKind, InteractionResponder, ResponseState};
pub use platform::{
    ChannelInfo, ChannelKind, ChatPlatform, Member, MessageInfo, SentMessage, ThreadInfo,
    ThreadMember, UserProfile,
};

/// Result alias for collaborator calls.
pub type Result<T> = std::result::Result<T, crate::error::PlatformError>;
