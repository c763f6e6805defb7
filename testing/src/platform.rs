//! In-memory chat platform with failure injection.
//!
//! [`MockChatPlatform`] keeps channels, thread membership, messages, users and
//! guild members in one mutex-guarded state and records every side effect so
//! tests can assert on it afterwards. Failures are injected per user or per
//! channel.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use middleman_core::error::{MISSING_ACCESS, PlatformError, UNKNOWN_CHANNEL};
use middleman_core::ids::{ChannelId, GuildId, MessageId, UserId};
use middleman_core::message::{Embed, OutgoingMessage};
use middleman_core::providers::{
    ChannelInfo, ChannelKind, ChatPlatform, Member, MessageInfo, Result, SentMessage, ThreadInfo,
    ThreadMember, UserProfile,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Account id of the bot itself.
pub const BOT_ID: UserId = UserId::new(999_000_000_000_000_001);

/// Error code returned for direct messages to users who block them.
const CANNOT_MESSAGE_USER: u32 = 50007;

/// A posted message as the fake stores it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    /// Message id.
    pub id: MessageId,
    /// Author.
    pub author: UserId,
    /// What was sent (or last edited in).
    pub message: OutgoingMessage,
}

#[derive(Default)]
struct State {
    next_id: u64,
    channels: HashMap<ChannelId, ChannelInfo>,
    members: HashMap<ChannelId, Vec<ThreadMember>>,
    messages: HashMap<ChannelId, Vec<PostedMessage>>,
    users: HashMap<UserId, UserProfile>,
    guild_members: HashMap<UserId, Member>,
    dms: Vec<(UserId, OutgoingMessage)>,
    edits: Vec<(ChannelId, MessageId, OutgoingMessage)>,
    deleted: Vec<(ChannelId, String)>,
    removed: Vec<(ChannelId, UserId, String)>,
    created: Vec<(ChannelId, String, String)>,

    cold_cache: bool,
    latency: Duration,
    upload_limit: Option<usize>,
    fail_enumeration: bool,
    fail_member_list: bool,
    fail_creation: Option<PlatformError>,
    fail_add: HashSet<UserId>,
    fail_dm: HashSet<UserId>,
    fail_fetch: HashSet<ChannelId>,
    fail_send: HashSet<ChannelId>,
    channel_errors: HashMap<ChannelId, PlatformError>,
}

/// In-memory [`ChatPlatform`].
pub struct MockChatPlatform {
    state: Mutex<State>,
}

impl Default for MockChatPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChatPlatform {
    /// Empty platform. Generated ids start at `1_000_000_000_000_000_000`.
    #[must_use]
    pub fn new() -> Self {
        let state = State {
            next_id: 1_000_000_000_000_000_000,
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    // --- seeding -----------------------------------------------------------

    /// Register an account.
    pub fn add_user(&self, user: UserProfile) {
        self.with(|s| {
            s.users.insert(user.id, user);
        });
    }

    /// Register a guild member (and its account).
    pub fn add_member(&self, member: Member) {
        self.with(|s| {
            s.users.insert(member.user.id, member.user.clone());
            s.guild_members.insert(member.user.id, member);
        });
    }

    /// Remove a guild member, e.g. one who left the server.
    pub fn remove_member(&self, user: UserId) {
        self.with(|s| {
            s.guild_members.remove(&user);
        });
    }

    /// Register a text channel.
    pub fn add_text_channel(&self, id: ChannelId, name: &str) {
        self.with(|s| {
            s.channels.insert(
                id,
                ChannelInfo {
                    id,
                    name: name.to_string(),
                    kind: ChannelKind::Text,
                },
            );
        });
    }

    /// Register a private thread with members and, optionally, a bot message
    /// carrying `embed` as its first message.
    pub fn add_thread(&self, id: ChannelId, name: &str, members: &[UserId], embed: Option<Embed>) {
        self.add_thread_of_kind(id, name, ChannelKind::PrivateThread, members, embed);
    }

    /// Register a thread of any kind.
    pub fn add_thread_of_kind(
        &self,
        id: ChannelId,
        name: &str,
        kind: ChannelKind,
        members: &[UserId],
        embed: Option<Embed>,
    ) {
        self.with(|s| {
            s.channels.insert(
                id,
                ChannelInfo {
                    id,
                    name: name.to_string(),
                    kind,
                },
            );
            let list = members
                .iter()
                .map(|u| ThreadMember {
                    user_id: *u,
                    is_bot: s.users.get(u).is_some_and(|p| p.bot),
                })
                .collect();
            s.members.insert(id, list);
            if let Some(embed) = embed {
                let msg_id = next_id(s);
                s.messages.entry(id).or_default().push(PostedMessage {
                    id: MessageId::new(msg_id),
                    author: BOT_ID,
                    message: OutgoingMessage::embed(embed),
                });
            }
        });
    }

    /// Post a message into a channel as `author`.
    pub fn post_as(&self, channel: ChannelId, author: UserId, message: OutgoingMessage) -> MessageId {
        self.with(|s| {
            let id = MessageId::new(next_id(s));
            s.messages.entry(channel).or_default().push(PostedMessage {
                id,
                author,
                message,
            });
            id
        })
    }

    // --- failure injection -------------------------------------------------

    /// Report empty membership caches so every check goes live.
    pub fn set_cold_cache(&self) {
        self.with(|s| s.cold_cache = true);
    }

    /// Delay every thread enumeration and membership lookup.
    pub fn set_latency(&self, latency: Duration) {
        self.with(|s| s.latency = latency);
    }

    /// Reject uploads whose attachments exceed `bytes` in total.
    pub fn set_upload_limit(&self, bytes: usize) {
        self.with(|s| s.upload_limit = Some(bytes));
    }

    /// Fail active-thread enumeration.
    pub fn fail_thread_enumeration(&self) {
        self.with(|s| s.fail_enumeration = true);
    }

    /// Fail guild member enumeration.
    pub fn fail_member_list(&self) {
        self.with(|s| s.fail_member_list = true);
    }

    /// Fail the next thread creations with `error`.
    pub fn fail_thread_creation(&self, error: PlatformError) {
        self.with(|s| s.fail_creation = Some(error));
    }

    /// Fail adding `user` to any thread.
    pub fn fail_member_add(&self, user: UserId) {
        self.with(|s| {
            s.fail_add.insert(user);
        });
    }

    /// Fail direct messages to `user`.
    pub fn fail_direct_messages(&self, user: UserId) {
        self.with(|s| {
            s.fail_dm.insert(user);
        });
    }

    /// Fail message reads in `channel`.
    pub fn fail_message_fetch(&self, channel: ChannelId) {
        self.with(|s| {
            s.fail_fetch.insert(channel);
        });
    }

    /// Fail sends into `channel`.
    pub fn fail_sends_to(&self, channel: ChannelId) {
        self.with(|s| {
            s.fail_send.insert(channel);
        });
    }

    /// Fail channel resolution of `channel` with `error`.
    pub fn set_channel_error(&self, channel: ChannelId, error: PlatformError) {
        self.with(|s| {
            s.channel_errors.insert(channel, error);
        });
    }

    // --- inspection --------------------------------------------------------

    /// Whether a channel still exists.
    #[must_use]
    pub fn channel_exists(&self, id: ChannelId) -> bool {
        self.with(|s| s.channels.contains_key(&id))
    }

    /// Current channel name.
    #[must_use]
    pub fn channel_name(&self, id: ChannelId) -> Option<String> {
        self.with(|s| s.channels.get(&id).map(|c| c.name.clone()))
    }

    /// Current thread members, in join order.
    #[must_use]
    pub fn members_of(&self, thread: ChannelId) -> Vec<UserId> {
        self.with(|s| {
            s.members
                .get(&thread)
                .map(|m| m.iter().map(|t| t.user_id).collect())
                .unwrap_or_default()
        })
    }

    /// Messages posted into a channel, oldest first.
    #[must_use]
    pub fn messages_in(&self, channel: ChannelId) -> Vec<PostedMessage> {
        self.with(|s| s.messages.get(&channel).cloned().unwrap_or_default())
    }

    /// Direct messages sent, in order.
    #[must_use]
    pub fn direct_messages(&self) -> Vec<(UserId, OutgoingMessage)> {
        self.with(|s| s.dms.clone())
    }

    /// Message edits, in order.
    #[must_use]
    pub fn edits(&self) -> Vec<(ChannelId, MessageId, OutgoingMessage)> {
        self.with(|s| s.edits.clone())
    }

    /// Deleted channels with reasons.
    #[must_use]
    pub fn deleted_channels(&self) -> Vec<(ChannelId, String)> {
        self.with(|s| s.deleted.clone())
    }

    /// Member removals with reasons.
    #[must_use]
    pub fn removals(&self) -> Vec<(ChannelId, UserId, String)> {
        self.with(|s| s.removed.clone())
    }

    /// Created threads: id, name, audit reason.
    #[must_use]
    pub fn created_threads(&self) -> Vec<(ChannelId, String, String)> {
        self.with(|s| s.created.clone())
    }

    async fn delay(&self) {
        let latency = self.with(|s| s.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

fn next_id(state: &mut State) -> u64 {
    state.next_id += 1;
    state.next_id
}

fn attachment_url(channel: ChannelId, message: MessageId, filename: &str) -> String {
    format!("https://cdn.test/attachments/{channel}/{message}/{filename}")
}

impl ChatPlatform for MockChatPlatform {
    async fn active_threads(&self, _guild: GuildId) -> Result<Vec<ThreadInfo>> {
        self.delay().await;
        self.with(|s| {
            if s.fail_enumeration {
                return Err(PlatformError::Transport("thread list unavailable".into()));
            }
            let mut threads: Vec<ThreadInfo> = s
                .channels
                .values()
                .filter(|c| c.kind.is_thread())
                .map(|c| ThreadInfo {
                    id: c.id,
                    name: c.name.clone(),
                    kind: c.kind,
                    cached_members: if s.cold_cache {
                        Vec::new()
                    } else {
                        s.members
                            .get(&c.id)
                            .map(|m| m.iter().map(|t| t.user_id).collect())
                            .unwrap_or_default()
                    },
                })
                .collect();
            threads.sort_by_key(|t| t.id);
            Ok(threads)
        })
    }

    async fn channel(&self, id: ChannelId) -> Result<Option<ChannelInfo>> {
        self.with(|s| {
            if let Some(err) = s.channel_errors.get(&id) {
                return Err(err.clone());
            }
            Ok(s.channels.get(&id).cloned())
        })
    }

    async fn thread_has_member(&self, thread: ChannelId, user: UserId) -> Result<bool> {
        self.delay().await;
        self.with(|s| {
            Ok(s.members
                .get(&thread)
                .is_some_and(|m| m.iter().any(|t| t.user_id == user)))
        })
    }

    async fn thread_members(&self, thread: ChannelId) -> Result<Vec<ThreadMember>> {
        self.with(|s| {
            s.members
                .get(&thread)
                .cloned()
                .ok_or_else(|| PlatformError::from_code(UNKNOWN_CHANNEL, "Unknown Channel"))
        })
    }

    async fn add_thread_member(&self, thread: ChannelId, user: UserId) -> Result<()> {
        self.with(|s| {
            if s.fail_add.contains(&user) {
                return Err(PlatformError::from_code(MISSING_ACCESS, "Missing Access"));
            }
            let is_bot = s.users.get(&user).is_some_and(|p| p.bot);
            let members = s
                .members
                .get_mut(&thread)
                .ok_or_else(|| PlatformError::from_code(UNKNOWN_CHANNEL, "Unknown Channel"))?;
            if !members.iter().any(|m| m.user_id == user) {
                members.push(ThreadMember {
                    user_id: user,
                    is_bot,
                });
            }
            Ok(())
        })
    }

    async fn remove_thread_member(&self, thread: ChannelId, user: UserId, reason: &str) -> Result<()> {
        self.with(|s| {
            if let Some(members) = s.members.get_mut(&thread) {
                members.retain(|m| m.user_id != user);
            }
            s.removed.push((thread, user, reason.to_string()));
            Ok(())
        })
    }

    async fn create_private_thread(&self, parent: ChannelId, name: &str, reason: &str) -> Result<ChannelInfo> {
        self.with(|s| {
            if let Some(err) = s.fail_creation.clone() {
                return Err(err);
            }
            if !s.channels.contains_key(&parent) {
                return Err(PlatformError::from_code(UNKNOWN_CHANNEL, "Unknown Channel"));
            }
            let id = ChannelId::new(next_id(s));
            let info = ChannelInfo {
                id,
                name: name.to_string(),
                kind: ChannelKind::PrivateThread,
            };
            s.channels.insert(id, info.clone());
            s.members.insert(
                id,
                vec![ThreadMember {
                    user_id: BOT_ID,
                    is_bot: true,
                }],
            );
            s.created.push((id, name.to_string(), reason.to_string()));
            Ok(info)
        })
    }

    async fn rename_thread(&self, thread: ChannelId, name: &str) -> Result<()> {
        self.with(|s| {
            let channel = s
                .channels
                .get_mut(&thread)
                .ok_or_else(|| PlatformError::from_code(UNKNOWN_CHANNEL, "Unknown Channel"))?;
            channel.name = name.to_string();
            Ok(())
        })
    }

    async fn delete_channel(&self, id: ChannelId, reason: &str) -> Result<()> {
        self.with(|s| {
            if s.channels.remove(&id).is_none() {
                return Err(PlatformError::from_code(UNKNOWN_CHANNEL, "Unknown Channel"));
            }
            s.members.remove(&id);
            s.deleted.push((id, reason.to_string()));
            Ok(())
        })
    }

    async fn oldest_messages(&self, channel: ChannelId, limit: usize) -> Result<Vec<MessageInfo>> {
        self.with(|s| {
            if s.fail_fetch.contains(&channel) {
                return Err(PlatformError::from_code(MISSING_ACCESS, "Missing Access"));
            }
            Ok(s.messages
                .get(&channel)
                .map(|msgs| {
                    msgs.iter()
                        .take(limit)
                        .map(|m| MessageInfo {
                            id: m.id,
                            author_id: m.author,
                            author_is_bot: m.author == BOT_ID
                                || s.users.get(&m.author).is_some_and(|u| u.bot),
                            content: m.message.content.clone(),
                            embeds: m.message.embeds.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    async fn send_message(&self, channel: ChannelId, message: OutgoingMessage) -> Result<SentMessage> {
        self.with(|s| {
            if s.fail_send.contains(&channel) {
                return Err(PlatformError::Transport("send failed".into()));
            }
            if !s.channels.contains_key(&channel) {
                return Err(PlatformError::from_code(UNKNOWN_CHANNEL, "Unknown Channel"));
            }
            let size: usize = message.attachments.iter().map(|a| a.data.len()).sum();
            if s.upload_limit.is_some_and(|limit| size > limit) {
                return Err(PlatformError::PayloadTooLarge(format!(
                    "Request entity too large: {size} bytes"
                )));
            }
            let id = MessageId::new(next_id(s));
            let attachment_urls = message
                .attachments
                .iter()
                .map(|a| attachment_url(channel, id, &a.filename))
                .collect();
            s.messages.entry(channel).or_default().push(PostedMessage {
                id,
                author: BOT_ID,
                message,
            });
            Ok(SentMessage {
                channel_id: channel,
                id,
                attachment_urls,
            })
        })
    }

    async fn edit_message(&self, channel: ChannelId, message: MessageId, edit: OutgoingMessage) -> Result<()> {
        self.with(|s| {
            let posted = s
                .messages
                .get_mut(&channel)
                .and_then(|msgs| msgs.iter_mut().find(|m| m.id == message))
                .ok_or_else(|| PlatformError::NotFound(format!("message {message}")))?;
            posted.message.components.clone_from(&edit.components);
            if edit.content.is_some() {
                posted.message.content.clone_from(&edit.content);
            }
            s.edits.push((channel, message, edit));
            Ok(())
        })
    }

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()> {
        self.with(|s| {
            if let Some(msgs) = s.messages.get_mut(&channel) {
                msgs.retain(|m| m.id != message);
            }
            Ok(())
        })
    }

    async fn user(&self, id: UserId) -> Result<Option<UserProfile>> {
        self.with(|s| Ok(s.users.get(&id).cloned()))
    }

    async fn member(&self, _guild: GuildId, id: UserId) -> Result<Option<Member>> {
        self.with(|s| Ok(s.guild_members.get(&id).cloned()))
    }

    async fn guild_members(&self, _guild: GuildId) -> Result<Vec<Member>> {
        self.with(|s| {
            if s.fail_member_list {
                return Err(PlatformError::Transport("member list unavailable".into()));
            }
            let mut members: Vec<Member> = s.guild_members.values().cloned().collect();
            members.sort_by_key(|m| m.user.id);
            Ok(members)
        })
    }

    async fn send_direct_message(&self, user: UserId, message: OutgoingMessage) -> Result<SentMessage> {
        self.with(|s| {
            if s.fail_dm.contains(&user) {
                return Err(PlatformError::from_code(
                    CANNOT_MESSAGE_USER,
                    "Cannot send messages to this user",
                ));
            }
            let id = MessageId::new(next_id(s));
            s.dms.push((user, message));
            Ok(SentMessage {
                channel_id: ChannelId::new(user.get()),
                id,
                attachment_urls: Vec::new(),
            })
        })
    }
}
