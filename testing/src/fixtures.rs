//! Ready-made configuration, members, interactions and a wired service.

#![allow(clippy::missing_panics_doc)]

use crate::collaborators::{
    InMemoryRegistryStore, MockTranscriptRenderer, RecordingLeaderboards, RecordingModLog,
};
use crate::mocks::{FixedClock, test_clock};
use crate::platform::{BOT_ID, MockChatPlatform};
use crate::responder::RecordingResponder;
use middleman_core::authority::Permissions;
use middleman_core::config::{BotConfig, DetectorBudgets, TierConfig};
use middleman_core::embed::{self, TicketEmbed};
use middleman_core::environment::Clock;
use middleman_core::ids::{ChannelId, GuildId, RoleId};
use middleman_core::model::TicketRecord;
use middleman_core::providers::{Interaction, InteractionKind, Member, UserProfile};
use middleman_core::registry::RegistrySnapshot;
use middleman_runtime::{Dispatch, Environment, TicketRegistry, TicketService};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Guild served by [`test_config`].
pub const GUILD: GuildId = GuildId::new(100);
/// Text channel holding the request panel; tickets are created under it.
pub const PANEL: ChannelId = ChannelId::new(200);
/// Transcript log channel.
pub const TRANSCRIPT_LOG: ChannelId = ChannelId::new(700);
/// Moderation log channel.
pub const MOD_LOG: ChannelId = ChannelId::new(701);
/// Middleman staff role.
pub const MM_ROLE: RoleId = RoleId::new(500);
/// Senior middleman staff role.
pub const SENIOR_ROLE: RoleId = RoleId::new(501);

/// Two tiers: `tier_low` pings `mm`, `tier_high` pings `mm` and `seniorMm`.
/// Deletes happen without delay.
#[must_use]
pub fn test_config() -> BotConfig {
    BotConfig {
        guild_id: GUILD,
        roles: HashMap::from([("mm".to_string(), MM_ROLE), ("seniorMm".to_string(), SENIOR_ROLE)]),
        staff_roles: vec![MM_ROLE, SENIOR_ROLE],
        mm_tiers: vec![
            TierConfig {
                key: "low".into(),
                name: "Small trades".into(),
                value: "tier_low".into(),
                ping_roles: vec!["mm".into()],
            },
            TierConfig {
                key: "high".into(),
                name: "Large trades".into(),
                value: "tier_high".into(),
                ping_roles: vec!["mm".into(), "seniorMm".into()],
            },
        ],
        transcript_log_channel_id: Some(TRANSCRIPT_LOG),
        server_mod_log_channel_id: Some(MOD_LOG),
        leaderboard_channel_id: Some(ChannelId::new(702)),
        trader_leaderboard_channel_id: Some(ChannelId::new(703)),
        transcript_viewer_url: "https://viewer.test/?url=".into(),
        detector: DetectorBudgets::default(),
        delete_delay_ms: 0,
        data_path: PathBuf::from("unused.json"),
        metrics_addr: None,
    }
}

/// An account with a migrated (discriminator-less) username.
#[must_use]
pub fn profile(id: u64, username: &str) -> UserProfile {
    UserProfile {
        id: id.into(),
        username: username.to_string(),
        discriminator: None,
        global_name: None,
        bot: false,
    }
}

/// A member without roles or permissions.
#[must_use]
pub fn trader(id: u64, username: &str) -> Member {
    Member {
        user: profile(id, username),
        nickname: None,
        roles: Vec::new(),
        permissions: Permissions::NONE,
    }
}

/// A member holding the middleman role.
#[must_use]
pub fn middleman(id: u64, username: &str) -> Member {
    Member {
        roles: vec![MM_ROLE],
        ..trader(id, username)
    }
}

/// An administrator without staff roles.
#[must_use]
pub fn admin(id: u64, username: &str) -> Member {
    Member {
        permissions: Permissions::ADMINISTRATOR,
        ..trader(id, username)
    }
}

/// A bot account in the guild.
#[must_use]
pub fn bot_member(id: u64, username: &str) -> Member {
    let mut member = trader(id, username);
    member.user.bot = true;
    member
}

fn interaction(member: &Member, channel: ChannelId, custom_id: &str, kind: InteractionKind) -> Interaction {
    Interaction {
        kind,
        custom_id: custom_id.to_string(),
        user: member.user.clone(),
        member: Some(member.clone()),
        guild_id: Some(GUILD),
        channel_id: channel,
        message_id: None,
    }
}

/// A button press in `channel`.
#[must_use]
pub fn button(member: &Member, channel: ChannelId, custom_id: &str) -> Interaction {
    interaction(member, channel, custom_id, InteractionKind::Button)
}

/// A select-menu pick in `channel`.
#[must_use]
pub fn select(member: &Member, channel: ChannelId, custom_id: &str, value: &str) -> Interaction {
    interaction(
        member,
        channel,
        custom_id,
        InteractionKind::Select {
            values: vec![value.to_string()],
        },
    )
}

/// A modal submission in `channel`.
#[must_use]
pub fn modal_submit(member: &Member, channel: ChannelId, custom_id: &str, fields: &[(&str, &str)]) -> Interaction {
    let fields = fields
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    interaction(member, channel, custom_id, InteractionKind::ModalSubmit { fields })
}

/// Turn a guild interaction into one arriving by direct message.
#[must_use]
pub fn in_dm(mut interaction: Interaction) -> Interaction {
    interaction.guild_id = None;
    interaction.member = None;
    interaction.channel_id = ChannelId::new(interaction.user.id.get());
    interaction
}

/// Every fake the service needs.
pub struct TestEnvironment {
    /// Chat platform.
    pub platform: MockChatPlatform,
    /// Transcript renderer.
    pub transcripts: MockTranscriptRenderer,
    /// Leaderboard display.
    pub leaderboards: RecordingLeaderboards,
    /// Moderation log.
    pub mod_log: RecordingModLog,
    /// Pinned clock.
    pub clock: FixedClock,
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self {
            platform: MockChatPlatform::new(),
            transcripts: MockTranscriptRenderer::new(),
            leaderboards: RecordingLeaderboards::new(),
            mod_log: RecordingModLog::new(),
            clock: test_clock(),
        }
    }
}

impl Environment for TestEnvironment {
    type Platform = MockChatPlatform;
    type Store = InMemoryRegistryStore;
    type Transcripts = MockTranscriptRenderer;
    type Leaderboards = RecordingLeaderboards;
    type ModLog = RecordingModLog;
    type Clock = FixedClock;

    fn platform(&self) -> &MockChatPlatform {
        &self.platform
    }

    fn transcripts(&self) -> &MockTranscriptRenderer {
        &self.transcripts
    }

    fn leaderboards(&self) -> &RecordingLeaderboards {
        &self.leaderboards
    }

    fn mod_log(&self) -> &RecordingModLog {
        &self.mod_log
    }

    fn clock(&self) -> &FixedClock {
        &self.clock
    }
}

/// A [`TicketService`] over [`TestEnvironment`] with the panel and log
/// channels registered.
///
/// # Example
///
/// ```
/// use middleman_testing::fixtures::Harness;
///
/// let harness = Harness::new();
/// assert_eq!(harness.store.save_count(), 0);
/// ```
pub struct Harness {
    /// The service under test.
    pub service: TicketService<TestEnvironment>,
    /// Handle on the registry store.
    pub store: InMemoryRegistryStore,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Harness over [`test_config`] and an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::build(test_config(), RegistrySnapshot::default())
    }

    /// Harness over a custom configuration and registry.
    #[must_use]
    pub fn build(config: BotConfig, snapshot: RegistrySnapshot) -> Self {
        let store = InMemoryRegistryStore::with_snapshot(snapshot.clone());
        let env = TestEnvironment::default();
        env.platform.add_member(bot_member(BOT_ID.get(), "middleman-bot"));
        env.platform.add_text_channel(PANEL, "request-middleman");
        for log in [config.transcript_log_channel_id, config.server_mod_log_channel_id]
            .into_iter()
            .flatten()
        {
            env.platform.add_text_channel(log, "logs");
        }
        let registry = TicketRegistry::new(store.clone(), snapshot);
        Self {
            service: TicketService::new(Arc::new(config), env, registry),
            store,
        }
    }

    /// The fake platform.
    #[must_use]
    pub fn platform(&self) -> &MockChatPlatform {
        &self.service.env().platform
    }

    /// The fakes.
    #[must_use]
    pub fn env(&self) -> &TestEnvironment {
        self.service.env()
    }

    /// Register guild members.
    pub fn add_members(&self, members: &[&Member]) {
        for member in members {
            self.platform().add_member((*member).clone());
        }
    }

    /// Open a ticket as the service would: a private thread holding the bot
    /// and both traders, the ticket embed as its first message and a
    /// registry record in the low tier.
    pub async fn seed_ticket(&self, thread: ChannelId, creator: &Member, other: &Member) {
        let now = self.env().clock.now();
        let ticket = TicketEmbed {
            creator: creator.user.id,
            other_trader: other.user.id,
            creator_offer: "10 gems".into(),
            other_offer: "$5".into(),
            creator_name: creator.user.username.clone(),
            created_at: now,
        };
        self.platform().add_thread(
            thread,
            &format!("SMALL - {} Ticket", creator.user.username.to_uppercase()),
            &[BOT_ID, creator.user.id, other.user.id],
            Some(embed::encode(&ticket)),
        );
        let record = TicketRecord::opened(
            now,
            GUILD,
            "low",
            vec!["mm".into()],
            creator.user.id,
            other.user.id,
        );
        self.service
            .registry()
            .update(|s| s.open_ticket(thread, record))
            .await;
    }

    /// Route one interaction through a fresh responder.
    pub async fn handle(&self, interaction: &Interaction) -> (Dispatch, RecordingResponder) {
        let responder = RecordingResponder::new();
        let outcome = self.service.handle(interaction, &responder).await;
        (outcome, responder)
    }
}
