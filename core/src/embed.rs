//! The ticket embed wire format.
//!
//! The embed posted when a ticket opens is the only place the two trading
//! parties are recorded *inside the platform*. The detector, close, reopen,
//! finalize and feedback routing all read the parties back from it, so the
//! layout below is a contract: [`encode`] and [`decode_parties`] are built from
//! the same [`PARTY_LABELS`] and must stay in lockstep.
//!
//! ```text
//! title:       Middleman Request
//! description: **Trader 1:** <@creator>
//!              **Trader 2:** <@other>
//! ```

use crate::ids::UserId;
use crate::message::Embed;
use crate::providers::MessageInfo;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Title identifying the ticket embed.
pub const TICKET_EMBED_TITLE: &str = "Middleman Request";

/// Labels of the two party lines, creator first.
pub const PARTY_LABELS: [&str; 2] = ["Trader 1", "Trader 2"];

/// How many of the oldest messages are searched for the ticket embed.
pub const EMBED_SEARCH_LIMIT: usize = 15;

#[allow(clippy::expect_used)]
static PARTY_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    PARTY_LABELS.map(|label| {
        Regex::new(&format!(r"{}:.*?<@!?(\d{{17,19}})>", regex::escape(label)))
            .expect("party pattern is a valid regex")
    })
});

/// Content of a freshly opened ticket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketEmbed {
    /// Trader 1.
    pub creator: UserId,
    /// Trader 2.
    pub other_trader: UserId,
    /// What trader 1 is giving.
    pub creator_offer: String,
    /// What trader 2 is giving.
    pub other_offer: String,
    /// Username of trader 1, for the footer.
    pub creator_name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Parties read back from a ticket embed. Either line may be unreadable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TicketParties {
    /// Trader 1, if the line parsed.
    pub creator: Option<UserId>,
    /// Trader 2, if the line parsed.
    pub other_trader: Option<UserId>,
}

impl TicketParties {
    /// Whether `user` is either parsed party.
    #[must_use]
    pub fn contains(&self, user: UserId) -> bool {
        self.creator == Some(user) || self.other_trader == Some(user)
    }

    /// Parsed parties without duplicates, creator first.
    #[must_use]
    pub fn distinct(&self) -> Vec<UserId> {
        let mut out = Vec::with_capacity(2);
        for user in [self.creator, self.other_trader].into_iter().flatten() {
            if !out.contains(&user) {
                out.push(user);
            }
        }
        out
    }

    /// True when neither line parsed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.creator.is_none() && self.other_trader.is_none()
    }
}

/// Render the party lines of the description.
#[must_use]
pub fn describe_parties(creator: UserId, other_trader: UserId) -> String {
    format!(
        "**{}:** {}\n**{}:** {}",
        PARTY_LABELS[0],
        creator.mention(),
        PARTY_LABELS[1],
        other_trader.mention()
    )
}

/// Build the ticket embed.
#[must_use]
pub fn encode(ticket: &TicketEmbed) -> Embed {
    Embed::titled(TICKET_EMBED_TITLE)
        .description(describe_parties(ticket.creator, ticket.other_trader))
        .field(
            format!("{} Offer", PARTY_LABELS[0]),
            format!("```\n{}\n```", ticket.creator_offer),
            false,
        )
        .field(
            format!("{} Offer", PARTY_LABELS[1]),
            format!("```\n{}\n```", ticket.other_offer),
            false,
        )
        .timestamp(ticket.created_at)
        .footer(format!("Ticket created by {}", ticket.creator_name))
}

/// Parse both party lines out of an embed description.
#[must_use]
pub fn decode_parties(description: &str) -> TicketParties {
    let capture = |pattern: &Regex| {
        pattern
            .captures(description)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .map(UserId::new)
    };
    TicketParties {
        creator: capture(&PARTY_PATTERNS[0]),
        other_trader: capture(&PARTY_PATTERNS[1]),
    }
}

/// Whether an embed is a ticket embed.
#[must_use]
pub fn is_ticket_embed(embed: &Embed) -> bool {
    embed.title.as_deref() == Some(TICKET_EMBED_TITLE)
}

/// Locate the bot's ticket embed among recent messages and decode it.
///
/// Returns `None` when no bot message leads with a ticket embed.
#[must_use]
pub fn find_ticket_parties(messages: &[MessageInfo]) -> Option<TicketParties> {
    messages
        .iter()
        .filter(|m| m.author_is_bot)
        .filter_map(|m| m.embeds.first())
        .find(|e| is_ticket_embed(e))
        .map(|e| decode_parties(e.description.as_deref().unwrap_or_default()))
}
