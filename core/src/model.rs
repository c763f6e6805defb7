//! Ticket data model.

use crate::ids::{GuildId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder stored for optional feedback fields left empty.
pub const NOT_PROVIDED: &str = "N/A";

/// The persisted record of one live ticket, keyed by its thread id.
///
/// Party and tier fields are written once at creation. `middleman_id` /
/// `claimed_by` are unset until the first successful claim and never change
/// afterwards. `last_mm_response_at` and `reminder_sent` belong to the reminder
/// collaborator; this crate only carries them through mutations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    /// When the ticket thread was created.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// Key into the configured tier list.
    pub tier_key: String,

    /// Role keys pinged when the ticket was opened.
    #[serde(default)]
    pub initial_ping_role_keys: Vec<String>,

    /// Trader 1, the user who opened the ticket.
    pub ticket_creator_id: UserId,

    /// Trader 2, the counterparty named in the request form.
    pub other_trader_id: UserId,

    /// Staff member who claimed the ticket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middleman_id: Option<UserId>,

    /// Mirror of `middleman_id`, kept for readers of the older layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<UserId>,

    /// Last time a middleman spoke in the ticket.
    #[serde(rename = "lastMMResponseAt", with = "chrono::serde::ts_milliseconds")]
    pub last_mm_response_at: DateTime<Utc>,

    /// Whether the inactivity reminder already fired.
    #[serde(default)]
    pub reminder_sent: bool,

    /// Owning guild.
    pub guild_id: GuildId,
}

impl TicketRecord {
    /// Build the record written when a ticket thread is opened.
    #[must_use]
    pub fn opened(
        now: DateTime<Utc>,
        guild_id: GuildId,
        tier_key: impl Into<String>,
        initial_ping_role_keys: Vec<String>,
        ticket_creator_id: UserId,
        other_trader_id: UserId,
    ) -> Self {
        Self {
            created_at: now,
            tier_key: tier_key.into(),
            initial_ping_role_keys,
            ticket_creator_id,
            other_trader_id,
            middleman_id: None,
            claimed_by: None,
            last_mm_response_at: now,
            reminder_sent: false,
            guild_id,
        }
    }

    /// Whether `user` is one of the two trading parties.
    #[must_use]
    pub fn is_party(&self, user: UserId) -> bool {
        self.ticket_creator_id == user || self.other_trader_id == user
    }

    /// Phase derivable from the record alone.
    #[must_use]
    pub const fn phase(&self) -> TicketPhase {
        if self.middleman_id.is_some() {
            TicketPhase::Claimed
        } else {
            TicketPhase::Created
        }
    }
}

/// Phase of a ticket that still has a registry record.
///
/// Closing removes the record, so closed, finalized and deleted tickets are
/// recognised by their thread and terminal controls instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TicketPhase {
    /// Thread exists, nobody has claimed it.
    Created,
    /// A staff member owns the ticket.
    Claimed,
}

/// One feedback submission. Append-only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    /// Who submitted the form.
    pub submitter_id: UserId,

    /// Display tag of the submitter at submission time.
    #[serde(default)]
    pub submitter_tag: String,

    /// The middleman being rated, if the ticket had one.
    pub middleman_id: Option<UserId>,

    /// Free-form short rating.
    pub rating: String,

    /// Additional comments, `N/A` when left empty.
    pub comments: String,

    /// Improvement suggestions, `N/A` when left empty.
    pub improvement_suggestions: String,

    /// Submission time.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// A user barred from the middleman service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MmBan {
    /// Banned user.
    pub user_id: UserId,
    /// Reason shown back to the user.
    pub reason: String,
}

/// The two point tables kept by the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LeaderboardKind {
    /// Completed tickets per middleman.
    Middleman,
    /// Completed trades per trading party.
    Trader,
}

impl fmt::Display for LeaderboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Middleman => f.write_str("middleman"),
            Self::Trader => f.write_str("trader"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::TimeZone;

    fn record() -> TicketRecord {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        TicketRecord::opened(
            now,
            GuildId::new(1),
            "standard",
            vec!["mm".to_string()],
            UserId::new(10),
            UserId::new(20),
        )
    }

    #[test]
    fn persisted_field_names_match_registry_layout() {
        let value = serde_json::to_value(record()).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "createdAt",
            "tierKey",
            "initialPingRoleKeys",
            "ticketCreatorId",
            "otherTraderId",
            "lastMMResponseAt",
            "reminderSent",
            "guildId",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj["createdAt"], serde_json::json!(1_700_000_000_000_i64));
        assert!(!obj.contains_key("middlemanId"));
    }

    #[test]
    fn phase_follows_claim() {
        let mut r = record();
        assert_eq!(r.phase(), TicketPhase::Created);
        r.middleman_id = Some(UserId::new(30));
        assert_eq!(r.phase(), TicketPhase::Claimed);
    }
}
