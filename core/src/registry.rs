//! The persisted registry document and the mutations applied to it.
//!
//! Everything here is synchronous and side-effect free. The runtime holds one
//! [`RegistrySnapshot`] per process, runs these methods under its lock and
//! writes the whole document back afterwards.

use crate::ids::{ChannelId, UserId};
use crate::model::{FeedbackEntry, LeaderboardKind, MmBan, TicketRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whole-state registry document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    /// Live tickets keyed by thread id.
    #[serde(default)]
    pub active_tickets: HashMap<ChannelId, TicketRecord>,

    /// Service bans, maintained by the moderation collaborator.
    #[serde(default)]
    pub mm_bans: Vec<MmBan>,

    /// Completed tickets per middleman.
    #[serde(default)]
    pub mm_leaderboard: HashMap<UserId, u64>,

    /// Completed trades per trader.
    #[serde(default)]
    pub trader_leaderboard: HashMap<UserId, u64>,

    /// Feedback submissions keyed by ticket id.
    #[serde(default)]
    pub ticket_feedback: HashMap<ChannelId, Vec<FeedbackEntry>>,
}

/// Result of a claim attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The caller is now the middleman.
    Claimed(TicketRecord),
    /// Someone else got there first.
    AlreadyClaimed(UserId),
    /// No active record for this thread.
    NotTracked,
}

impl RegistrySnapshot {
    /// Active record for a ticket thread.
    #[must_use]
    pub fn ticket(&self, id: ChannelId) -> Option<&TicketRecord> {
        self.active_tickets.get(&id)
    }

    /// Start tracking a newly opened ticket.
    pub fn open_ticket(&mut self, id: ChannelId, record: TicketRecord) {
        self.active_tickets.insert(id, record);
    }

    /// Stop tracking a ticket. Returns the record if it was present.
    pub fn remove_ticket(&mut self, id: ChannelId) -> Option<TicketRecord> {
        self.active_tickets.remove(&id)
    }

    /// Ids of active tickets where `user` is a trading party.
    #[must_use]
    pub fn tickets_for_party(&self, user: UserId) -> Vec<ChannelId> {
        let mut ids: Vec<ChannelId> = self
            .active_tickets
            .iter()
            .filter(|(_, record)| record.is_party(user))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// First-claim-wins check-and-set.
    ///
    /// Must run as one uninterrupted step: the caller holds the registry lock
    /// for the duration of this call, so two claims can never both observe an
    /// unset middleman.
    pub fn try_claim(&mut self, id: ChannelId, claimer: UserId) -> ClaimOutcome {
        let Some(record) = self.active_tickets.get_mut(&id) else {
            return ClaimOutcome::NotTracked;
        };
        if let Some(existing) = record.middleman_id {
            return ClaimOutcome::AlreadyClaimed(existing);
        }
        record.middleman_id = Some(claimer);
        record.claimed_by = Some(claimer);
        ClaimOutcome::Claimed(record.clone())
    }

    /// Ban entry for `user`, if any.
    #[must_use]
    pub fn ban_for(&self, user: UserId) -> Option<&MmBan> {
        self.mm_bans.iter().find(|ban| ban.user_id == user)
    }

    /// Add one point to `user` on the given leaderboard. Returns the new total.
    pub fn award_point(&mut self, kind: LeaderboardKind, user: UserId) -> u64 {
        let board = match kind {
            LeaderboardKind::Middleman => &mut self.mm_leaderboard,
            LeaderboardKind::Trader => &mut self.trader_leaderboard,
        };
        let points = board.entry(user).or_insert(0);
        *points += 1;
        *points
    }

    /// Current points for `user`.
    #[must_use]
    pub fn points(&self, kind: LeaderboardKind, user: UserId) -> u64 {
        let board = match kind {
            LeaderboardKind::Middleman => &self.mm_leaderboard,
            LeaderboardKind::Trader => &self.trader_leaderboard,
        };
        board.get(&user).copied().unwrap_or(0)
    }

    /// Append a feedback entry for a ticket.
    pub fn append_feedback(&mut self, ticket: ChannelId, entry: FeedbackEntry) {
        self.ticket_feedback.entry(ticket).or_default().push(entry);
    }

    /// Feedback recorded for a ticket, oldest first.
    #[must_use]
    pub fn feedback(&self, ticket: ChannelId) -> &[FeedbackEntry] {
        self.ticket_feedback
            .get(&ticket)
            .map_or(&[], Vec::as_slice)
    }
}
