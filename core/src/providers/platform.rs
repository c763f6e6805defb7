use super::Result;
use crate::authority::Permissions;
use crate::ids::{ChannelId, GuildId, MessageId, RoleId, UserId};
use crate::message::{Embed, OutgoingMessage};
use std::future::Future;

/// Kind of a channel as far as tickets care.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    /// Regular text channel (thread parent).
    Text,
    /// Invite-only thread. Tickets are always private threads.
    PrivateThread,
    /// Public thread.
    PublicThread,
    /// Anything else.
    Other,
}

impl ChannelKind {
    /// Whether this is any kind of thread.
    #[must_use]
    pub const fn is_thread(self) -> bool {
        matches!(self, Self::PrivateThread | Self::PublicThread)
    }
}

/// A resolved channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Channel id.
    pub id: ChannelId,
    /// Current name.
    pub name: String,
    /// Kind.
    pub kind: ChannelKind,
}

/// An active thread with whatever membership the client has cached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadInfo {
    /// Thread id.
    pub id: ChannelId,
    /// Thread name.
    pub name: String,
    /// Kind of thread.
    pub kind: ChannelKind,
    /// Members known without a network call. May be incomplete.
    pub cached_members: Vec<UserId>,
}

/// A member of a thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThreadMember {
    /// Member id.
    pub user_id: UserId,
    /// Whether the member is a bot account.
    pub is_bot: bool,
}

/// A message read back from a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageInfo {
    /// Message id.
    pub id: MessageId,
    /// Author.
    pub author_id: UserId,
    /// Whether the author is a bot.
    pub author_is_bot: bool,
    /// Text content.
    pub content: Option<String>,
    /// Embeds in order.
    pub embeds: Vec<Embed>,
}

/// Receipt for a sent message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    /// Channel the message landed in.
    pub channel_id: ChannelId,
    /// New message id.
    pub id: MessageId,
    /// Hosted URLs of uploaded attachments, in order.
    pub attachment_urls: Vec<String>,
}

/// A platform account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    /// Account id.
    pub id: UserId,
    /// Unique account name.
    pub username: String,
    /// Legacy four-digit discriminator; `None` or `"0"` for migrated accounts.
    pub discriminator: Option<String>,
    /// Global display name.
    pub global_name: Option<String>,
    /// Bot account.
    pub bot: bool,
}

impl UserProfile {
    /// `name#1234` for legacy accounts, the bare username otherwise.
    #[must_use]
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if d != "0" => format!("{}#{d}", self.username),
            _ => self.username.clone(),
        }
    }
}

/// A guild member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Member {
    /// Underlying account.
    pub user: UserProfile,
    /// Guild nickname.
    pub nickname: Option<String>,
    /// Held roles.
    pub roles: Vec<RoleId>,
    /// Effective guild permissions.
    pub permissions: Permissions,
}

impl Member {
    /// Name shown in the guild: nickname, then global name, then username.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .or(self.user.global_name.as_deref())
            .unwrap_or(&self.user.username)
    }
}

/// The chat platform.
///
/// Failures are reported as [`PlatformError`](crate::error::PlatformError);
/// "entity gone" lookups return `Ok(None)` where the signature allows it.
pub trait ChatPlatform: Send + Sync {
    /// Threads currently active in the guild.
    fn active_threads(&self, guild: GuildId) -> impl Future<Output = Result<Vec<ThreadInfo>>> + Send;

    /// Resolve a channel by id. `Ok(None)` when it no longer exists.
    fn channel(&self, id: ChannelId) -> impl Future<Output = Result<Option<ChannelInfo>>> + Send;

    /// Live membership lookup.
    fn thread_has_member(
        &self,
        thread: ChannelId,
        user: UserId,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Full member list of a thread.
    fn thread_members(&self, thread: ChannelId) -> impl Future<Output = Result<Vec<ThreadMember>>> + Send;

    /// Add a user to a thread.
    fn add_thread_member(&self, thread: ChannelId, user: UserId) -> impl Future<Output = Result<()>> + Send;

    /// Remove a user from a thread.
    fn remove_thread_member(
        &self,
        thread: ChannelId,
        user: UserId,
        reason: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Create a private thread under `parent`.
    fn create_private_thread(
        &self,
        parent: ChannelId,
        name: &str,
        reason: &str,
    ) -> impl Future<Output = Result<ChannelInfo>> + Send;

    /// Rename a thread.
    fn rename_thread(&self, thread: ChannelId, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Delete a channel or thread.
    fn delete_channel(&self, id: ChannelId, reason: &str) -> impl Future<Output = Result<()>> + Send;

    /// The `limit` oldest messages of a channel, oldest first.
    fn oldest_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<MessageInfo>>> + Send;

    /// Post a message.
    fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> impl Future<Output = Result<SentMessage>> + Send;

    /// Replace the content and components of a posted message.
    fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        edit: OutgoingMessage,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Delete a posted message.
    fn delete_message(&self, channel: ChannelId, message: MessageId) -> impl Future<Output = Result<()>> + Send;

    /// Look up an account. `Ok(None)` when unknown.
    fn user(&self, id: UserId) -> impl Future<Output = Result<Option<UserProfile>>> + Send;

    /// Look up a guild member. `Ok(None)` when not in the guild.
    fn member(&self, guild: GuildId, id: UserId) -> impl Future<Output = Result<Option<Member>>> + Send;

    /// Every member of the guild.
    fn guild_members(&self, guild: GuildId) -> impl Future<Output = Result<Vec<Member>>> + Send;

    /// Send a direct message.
    fn send_direct_message(
        &self,
        user: UserId,
        message: OutgoingMessage,
    ) -> impl Future<Output = Result<SentMessage>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(discriminator: Option<&str>) -> UserProfile {
        UserProfile {
            id: UserId::new(1),
            username: "alice".into(),
            discriminator: discriminator.map(str::to_string),
            global_name: Some("Alice A".into()),
            bot: false,
        }
    }

    #[test]
    fn tag_hides_migrated_discriminator() {
        assert_eq!(profile(Some("0")).tag(), "alice");
        assert_eq!(profile(Some("1234")).tag(), "alice#1234");
    }

    #[test]
    fn display_name_prefers_nickname() {
        let mut member = Member {
            user: profile(None),
            nickname: Some("Ally".into()),
            roles: Vec::new(),
            permissions: Permissions::NONE,
        };
        assert_eq!(member.display_name(), "Ally");
        member.nickname = None;
        assert_eq!(member.display_name(), "Alice A");
    }
}
