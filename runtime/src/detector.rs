//! Open-ticket detection.
//!
//! Three sources can disagree about whether a user has an open ticket: live
//! thread membership, the ticket embed inside the thread, and the registry.
//! The check runs in two ordered phases:
//!
//! 1. [`OpenTicketDetector::scan_live_threads`] walks active private threads.
//!    Membership comes from the client cache, then a live lookup. For member
//!    threads the ticket embed is decoded; the user counts only as a party,
//!    never as an observer. If the messages cannot be read at all the thread
//!    is reported as the user's ticket.
//! 2. [`OpenTicketDetector::check_registry`] walks registry records naming
//!    the user. Records whose thread is gone are pruned; surviving threads
//!    need a positive live membership check.
//!
//! The whole check runs under a wall-clock budget and answers "no ticket"
//! when the budget runs out.

use crate::metrics::DetectorMetrics;
use crate::registry::TicketRegistry;
use middleman_core::embed::{EMBED_SEARCH_LIMIT, find_ticket_parties};
use middleman_core::ids::{ChannelId, GuildId, UserId};
use middleman_core::providers::{ChannelKind, ChatPlatform, RegistryStore, ThreadInfo};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How a check reached its answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckSource {
    /// The ticket embed names the user as a party.
    LiveScan,
    /// The user is in the thread but its messages could not be read.
    UnverifiedMembership,
    /// A registry record names the user and they are still in its thread.
    Registry,
    /// Both phases completed without a match.
    NotFound,
    /// Active threads could not be enumerated.
    EnumerationFailed,
    /// The budget ran out first.
    TimedOut,
}

impl CheckSource {
    /// Metric label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LiveScan => "live_scan",
            Self::UnverifiedMembership => "unverified_membership",
            Self::Registry => "registry",
            Self::NotFound => "not_found",
            Self::EnumerationFailed => "enumeration_failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Result of an open-ticket check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenTicketCheck {
    /// The user's open ticket, if one was found.
    pub ticket: Option<ChannelId>,
    /// How the answer was reached.
    pub source: CheckSource,
}

impl OpenTicketCheck {
    const fn found(ticket: ChannelId, source: CheckSource) -> Self {
        Self {
            ticket: Some(ticket),
            source,
        }
    }

    const fn none(source: CheckSource) -> Self {
        Self {
            ticket: None,
            source,
        }
    }

    /// Whether the user already has a ticket.
    #[must_use]
    pub const fn has_ticket(&self) -> bool {
        self.ticket.is_some()
    }
}

/// Two-phase open-ticket detector over a platform and the registry.
pub struct OpenTicketDetector<'a, P, S> {
    platform: &'a P,
    registry: &'a TicketRegistry<S>,
}

impl<'a, P: ChatPlatform, S: RegistryStore> OpenTicketDetector<'a, P, S> {
    /// Bind a detector to its sources.
    pub const fn new(platform: &'a P, registry: &'a TicketRegistry<S>) -> Self {
        Self { platform, registry }
    }

    /// Decide whether `user` has an open ticket within `budget`.
    pub async fn check(&self, user: UserId, guild: GuildId, budget: Duration) -> OpenTicketCheck {
        let started = Instant::now();
        let result = match tokio::time::timeout(budget, self.check_unbounded(user, guild)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    user_id = %user,
                    budget_ms = budget.as_millis(),
                    "Open-ticket check timed out, allowing ticket creation"
                );
                OpenTicketCheck::none(CheckSource::TimedOut)
            }
        };
        DetectorMetrics::record_check(result.source.label(), started.elapsed());
        result
    }

    async fn check_unbounded(&self, user: UserId, guild: GuildId) -> OpenTicketCheck {
        match self.scan_live_threads(user, guild).await {
            Ok(Some(found)) => return found,
            Ok(None) => {}
            Err(e) => {
                warn!(user_id = %user, error = %e, "Could not enumerate active threads");
                return OpenTicketCheck::none(CheckSource::EnumerationFailed);
            }
        }
        self.check_registry(user).await
    }

    /// Phase 1: scan active private threads.
    ///
    /// # Errors
    ///
    /// Returns the platform error if active threads cannot be enumerated.
    /// Failures inside individual threads never surface.
    pub async fn scan_live_threads(
        &self,
        user: UserId,
        guild: GuildId,
    ) -> Result<Option<OpenTicketCheck>, middleman_core::error::PlatformError> {
        let threads = self.platform.active_threads(guild).await?;
        for thread in threads.iter().filter(|t| t.kind == ChannelKind::PrivateThread) {
            if !self.is_member(thread, user).await {
                continue;
            }
            match self.platform.oldest_messages(thread.id, EMBED_SEARCH_LIMIT).await {
                Ok(messages) => match find_ticket_parties(&messages) {
                    Some(parties) if parties.contains(user) => {
                        info!(user_id = %user, ticket_id = %thread.id, "User is a party in an open ticket");
                        return Ok(Some(OpenTicketCheck::found(thread.id, CheckSource::LiveScan)));
                    }
                    Some(_) => {
                        debug!(user_id = %user, ticket_id = %thread.id, "User is in thread but not a party");
                    }
                    None => {
                        debug!(ticket_id = %thread.id, "No ticket embed in thread, skipping");
                    }
                },
                Err(e) => {
                    warn!(
                        user_id = %user,
                        ticket_id = %thread.id,
                        error = %e,
                        "Could not read ticket messages, assuming the user is a party"
                    );
                    return Ok(Some(OpenTicketCheck::found(
                        thread.id,
                        CheckSource::UnverifiedMembership,
                    )));
                }
            }
        }
        Ok(None)
    }

    async fn is_member(&self, thread: &ThreadInfo, user: UserId) -> bool {
        if thread.cached_members.contains(&user) {
            return true;
        }
        self.platform
            .thread_has_member(thread.id, user)
            .await
            .unwrap_or(false)
    }

    /// Phase 2: confirm registry records naming `user`, pruning dead ones.
    pub async fn check_registry(&self, user: UserId) -> OpenTicketCheck {
        let candidates = self.registry.read(|s| s.tickets_for_party(user));
        for id in candidates {
            match self.platform.channel(id).await {
                Ok(Some(channel)) if channel.kind.is_thread() => {
                    if self.platform.thread_has_member(id, user).await.unwrap_or(false) {
                        info!(user_id = %user, ticket_id = %id, "User found in registry-tracked ticket");
                        return OpenTicketCheck::found(id, CheckSource::Registry);
                    }
                }
                Ok(_) => self.prune(id).await,
                Err(e) if e.is_not_found() => self.prune(id).await,
                Err(e) => {
                    warn!(ticket_id = %id, error = %e, "Could not resolve tracked ticket, keeping record");
                }
            }
        }
        OpenTicketCheck::none(CheckSource::NotFound)
    }

    async fn prune(&self, id: ChannelId) {
        if self.registry.remove_ticket(id).await.is_some() {
            DetectorMetrics::record_pruned();
            info!(ticket_id = %id, "Pruned registry record for a ticket that no longer exists");
        }
    }
}
