//! The ticket service.
//!
//! [`TicketService`] owns the registry and the injected collaborators and
//! implements every lifecycle transition as an async method. Each method
//! handles one interaction from start to finish; user-facing rejections come
//! back as [`TicketError`] and are answered by the router.
//!
//! ```text
//! NONE ──create──▶ CREATED ──claim──▶ CLAIMED
//!                     │                  │
//!                     └──────close───────┴──▶ CLOSED ──┬─▶ FINALIZED
//!                                                      ├─▶ DELETED
//!                                                      └─▶ REOPENED
//! ```

mod claim;
mod close;
mod feedback;
mod request;
mod terminal;

pub use request::{request_form_title, thread_name};

use crate::best_effort::BestEffort;
use crate::detector::{OpenTicketCheck, OpenTicketDetector};
use crate::environment::Environment;
use crate::registry::TicketRegistry;
use crate::scoring::Board;
use middleman_core::authority::{Authority, Permissions};
use middleman_core::config::BotConfig;
use middleman_core::embed::{EMBED_SEARCH_LIMIT, TicketParties, find_ticket_parties};
use middleman_core::error::{Result, TicketError};
use middleman_core::ids::{ChannelId, GuildId, UserId};
use middleman_core::message::{Button, ButtonStyle};
use middleman_core::model::LeaderboardKind;
use middleman_core::component::ComponentId;
use middleman_core::providers::{ChannelInfo, ChatPlatform, Interaction};
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Drives ticket lifecycles against injected collaborators.
pub struct TicketService<E: Environment> {
    config: Arc<BotConfig>,
    env: E,
    registry: TicketRegistry<E::Store>,
    creating: Mutex<HashSet<UserId>>,
    finalizing: Mutex<HashSet<ChannelId>>,
}

impl<E: Environment> TicketService<E> {
    /// Assemble a service from loaded parts.
    pub fn new(config: Arc<BotConfig>, env: E, registry: TicketRegistry<E::Store>) -> Self {
        Self {
            config,
            env,
            registry,
            creating: Mutex::new(HashSet::new()),
            finalizing: Mutex::new(HashSet::new()),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Injected collaborators.
    pub const fn env(&self) -> &E {
        &self.env
    }

    /// The ticket registry.
    pub const fn registry(&self) -> &TicketRegistry<E::Store> {
        &self.registry
    }

    /// Run the open-ticket check for `user`.
    pub async fn check_open_ticket(&self, user: UserId, guild: GuildId, budget: Duration) -> OpenTicketCheck {
        OpenTicketDetector::new(self.env.platform(), &self.registry)
            .check(user, guild, budget)
            .await
    }

    /// Ban reason for `user`, if banned.
    pub fn ban_reason(&self, user: UserId) -> Option<String> {
        self.registry.read(|s| s.ban_for(user).map(|b| b.reason.clone()))
    }

    fn guild(&self, interaction: &Interaction) -> GuildId {
        interaction.guild_id.unwrap_or(self.config.guild_id)
    }

    fn board(&self, kind: LeaderboardKind, guild: GuildId) -> Board {
        Board {
            kind,
            guild,
            channel: self.config.leaderboard_channel(kind),
        }
    }

    /// Check that the interacting member holds `authority`.
    ///
    /// The member attached to the interaction is used when present, otherwise
    /// it is fetched. A member that cannot be found holds nothing.
    async fn authorize(
        &self,
        interaction: &Interaction,
        authority: Authority,
        action: &'static str,
    ) -> Result<()> {
        let member = match &interaction.member {
            Some(member) => Some(member.clone()),
            None => self
                .env
                .platform()
                .member(self.guild(interaction), interaction.user.id)
                .await
                .best_effort("fetch interacting member")
                .flatten(),
        };
        let (permissions, roles) = member.map_or((Permissions::NONE, Vec::new()), |m| {
            (m.permissions, m.roles)
        });
        if authority.permits(permissions, &roles, &self.config.staff_roles) {
            return Ok(());
        }
        debug!(user_id = %interaction.user.id, ?authority, "Authority check failed");
        Err(match authority {
            Authority::Administrator => TicketError::AdministratorRequired,
            Authority::Manage | Authority::Elevated => TicketError::Unauthorized { action },
        })
    }

    /// Resolve the thread a ticket control lives in.
    async fn ticket_thread(&self, interaction: &Interaction, ticket: ChannelId) -> Result<ChannelInfo> {
        if interaction.channel_id != ticket {
            warn!(
                ticket_id = %ticket,
                channel_id = %interaction.channel_id,
                "Ticket control used outside its thread"
            );
            return Err(TicketError::NotATicket(interaction.channel_id));
        }
        match self.env.platform().channel(ticket).await? {
            Some(channel) if channel.kind.is_thread() => Ok(channel),
            _ => Err(TicketError::NotATicket(ticket)),
        }
    }

    /// Parties decoded from the ticket embed. Unreadable threads yield none.
    async fn ticket_parties(&self, thread: ChannelId) -> TicketParties {
        self.env
            .platform()
            .oldest_messages(thread, EMBED_SEARCH_LIMIT)
            .await
            .best_effort("read ticket embed")
            .and_then(|messages| find_ticket_parties(&messages))
            .unwrap_or_default()
    }

    /// Reserve users for an in-flight ticket creation.
    fn creation_guard(&self) -> InFlight<'_, UserId> {
        InFlight::new(&self.creating)
    }

    /// Reserve tickets for an in-flight finalize.
    fn finalize_guard(&self) -> InFlight<'_, ChannelId> {
        InFlight::new(&self.finalizing)
    }
}

/// Close control posted in every live ticket.
fn close_button(ticket: ChannelId) -> Button {
    Button::new(ComponentId::Close { ticket }.to_string(), "Close Ticket", ButtonStyle::Danger).emoji("❌")
}

/// Keys reserved by one in-flight operation, released on drop.
///
/// A user can be part of at most one creation at a time, so two concurrent
/// requests involving the same trader cannot both pass the open-ticket check.
/// A ticket can be finalized by one interaction at a time, so a double press
/// awards a single middleman point.
struct InFlight<'a, K: Copy + Eq + Hash> {
    pending: &'a Mutex<HashSet<K>>,
    held: Vec<K>,
}

impl<'a, K: Copy + Eq + Hash> InFlight<'a, K> {
    fn new(pending: &'a Mutex<HashSet<K>>) -> Self {
        Self {
            pending,
            held: Vec::with_capacity(2),
        }
    }

    /// Returns `false` if another operation already holds `key`.
    fn reserve(&mut self, key: K) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.insert(key) {
            return false;
        }
        self.held.push(key);
        true
    }
}

impl<K: Copy + Eq + Hash> Drop for InFlight<'_, K> {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        for key in &self.held {
            pending.remove(key);
        }
    }
}
