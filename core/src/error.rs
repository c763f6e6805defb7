//! Error taxonomy.
//!
//! [`PlatformError`] is what collaborators return. [`TicketError`] is what the
//! lifecycle returns; its `Display` text is exactly what the interacting user
//! is shown when [`TicketError::is_user_error`] is true.

use crate::ids::{ChannelId, UserId};
use thiserror::Error;

/// Platform code: the channel no longer exists.
pub const UNKNOWN_CHANNEL: u32 = 10003;
/// Platform code: the interaction token expired.
pub const UNKNOWN_INTERACTION: u32 = 10062;
/// Platform code: the bot lacks access.
pub const MISSING_ACCESS: u32 = 50001;
/// Platform code: invalid form body (bad name, payload too large).
pub const INVALID_FORM_BODY: u32 = 50035;

/// Failure reported by a platform, storage or rendering collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// A coded platform API error.
    #[error("platform error {code}: {message}")]
    Api {
        /// Numeric platform error code.
        code: u32,
        /// Platform-supplied message.
        message: String,
    },

    /// The addressed entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Upload rejected for size.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Network or transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Persistence medium failure.
    #[error("storage error: {0}")]
    Storage(String),
}

impl PlatformError {
    /// Build a coded API error.
    #[must_use]
    pub fn from_code(code: u32, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Platform code, when there is one.
    #[must_use]
    pub const fn code(&self) -> Option<u32> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// The interaction can no longer be answered.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        matches!(self.code(), Some(UNKNOWN_INTERACTION))
    }

    /// The upload was too big for the destination.
    #[must_use]
    pub fn is_payload_too_large(&self) -> bool {
        match self {
            Self::PayloadTooLarge(_) => true,
            Self::Api { code, message } => {
                *code == INVALID_FORM_BODY && message.to_ascii_lowercase().contains("size")
            }
            _ => false,
        }
    }

    /// The entity is gone for good (as opposed to a transient failure).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_)) || matches!(self.code(), Some(UNKNOWN_CHANNEL))
    }
}

/// Lifecycle and routing failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    /// The interaction token expired before it was acknowledged.
    #[error("this interaction has expired")]
    InteractionExpired,

    /// The user lacks the authority for this action.
    #[error("You do not have permission to {action}.")]
    Unauthorized {
        /// Short verb phrase, e.g. "close this ticket".
        action: &'static str,
    },

    /// Only administrators may use this control.
    #[error("You must be an Administrator to use the final delete button.")]
    AdministratorRequired,

    /// The addressed channel is not a ticket thread.
    #[error("This is not a ticket thread.")]
    NotATicket(ChannelId),

    /// No active record exists for the thread.
    #[error("Ticket data not found.")]
    RecordMissing(ChannelId),

    /// Unknown tier value.
    #[error("Invalid middleman selected. Please try selecting again.")]
    TierNotFound(String),

    /// The counterparty could not be resolved.
    #[error("Could not find the trader: \"{0}\"\n\n**Try these formats:**\n• User ID: `123456789012345678`\n• Mention: `@username`\n• Username: `john_doe` or `JohnDoe#1234`\n• Display name: `John Doe`\n\nMake sure the user is in this server and spelled correctly.")]
    CounterpartyNotFound(String),

    /// The requester named themselves.
    #[error("You cannot create a ticket with yourself.")]
    SelfTrade,

    /// The counterparty is a bot.
    #[error("You cannot create a ticket with a bot.")]
    BotCounterparty,

    /// The interacting user is banned from the service.
    #[error("You are currently banned from requesting a middleman. Reason: {reason}")]
    Banned {
        /// Ban reason.
        reason: String,
    },

    /// The counterparty is banned from the service.
    #[error("The other trader ({}) is currently banned from using the middleman service. Reason: {reason}", .user.mention())]
    CounterpartyBanned {
        /// The banned counterparty.
        user: UserId,
        /// Ban reason.
        reason: String,
    },

    /// Somebody else claimed first.
    #[error("🔒 This ticket is already claimed by {}.", .0.mention())]
    AlreadyClaimed(UserId),

    /// The requester already has an open ticket.
    #[error("You already have an open ticket: {}. Please close your current ticket before creating a new one.", .0.mention())]
    RequesterHasTicket(ChannelId),

    /// The counterparty already has an open ticket.
    #[error("The other trader ({}) already has an open ticket: {}. They need to close their current ticket first.", .user.mention(), .ticket.mention())]
    CounterpartyHasTicket {
        /// The counterparty.
        user: UserId,
        /// Their open ticket.
        ticket: ChannelId,
    },

    /// Another request involving the same user is still being set up.
    #[error("A ticket involving {} is already being created. Please wait a moment.", .0.mention())]
    CreationInProgress(UserId),

    /// Another interaction is already finalizing the ticket.
    #[error("This ticket is already being finalized.")]
    FinalizeInProgress(ChannelId),

    /// Thread creation was rejected for its name.
    #[error("Error creating ticket: The generated thread name is too long or contains invalid characters.")]
    InvalidThreadName,

    /// Thread parent is gone.
    #[error("Error: Could not create the ticket thread. The parent channel may no longer exist or is inaccessible.")]
    ParentMissing,

    /// The bot may not create threads here.
    #[error("Error: I seem to be missing permissions to create a thread or add members in the target channel.")]
    MissingPermissions,

    /// A party could not be added to the new thread; it has been removed.
    #[error("Could not add {subject} to the ticket. Ticket not created.")]
    PartyAddFailed {
        /// The party that could not be added.
        user: UserId,
        /// "you" or "the other trader (<@id>)".
        subject: String,
    },

    /// The thread was created but setup failed afterwards; it has been removed.
    #[error("An error occurred while creating the ticket. Please try again.")]
    SetupFailed(#[source] PlatformError),

    /// Unexpected collaborator failure.
    #[error("platform failure: {0}")]
    Platform(#[from] PlatformError),
}

impl TicketError {
    /// Whether the message is meant for the interacting user.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::InteractionExpired | Self::Platform(_))
    }

    /// Whether nothing should be sent back at all.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        matches!(self, Self::InteractionExpired)
    }

    /// Map a thread-creation failure onto the messages users understand.
    #[must_use]
    pub fn from_creation_failure(err: PlatformError) -> Self {
        match err.code() {
            Some(INVALID_FORM_BODY) if err.to_string().contains("name") => Self::InvalidThreadName,
            Some(UNKNOWN_CHANNEL) => Self::ParentMissing,
            Some(MISSING_ACCESS) => Self::MissingPermissions,
            _ => Self::SetupFailed(err),
        }
    }

    /// Member-add failure for the requester or the counterparty.
    #[must_use]
    pub fn party_add_failed(user: UserId, is_requester: bool) -> Self {
        let subject = if is_requester {
            "you".to_string()
        } else {
            format!("the other trader ({})", user.mention())
        };
        Self::PartyAddFailed { user, subject }
    }
}

/// Message shown for failures that are not the user's fault.
pub const GENERIC_FAILURE: &str = "An unexpected error occurred. Please try again later.";

/// Result alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, TicketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_interactions_are_recognised_by_code() {
        assert!(PlatformError::from_code(UNKNOWN_INTERACTION, "Unknown interaction").is_expired());
        assert!(!PlatformError::from_code(UNKNOWN_CHANNEL, "Unknown Channel").is_expired());
    }

    #[test]
    fn size_rejections_are_payload_too_large() {
        assert!(PlatformError::from_code(INVALID_FORM_BODY, "File exceeds maximum size").is_payload_too_large());
        assert!(!PlatformError::from_code(INVALID_FORM_BODY, "Invalid name").is_payload_too_large());
    }

    #[test]
    fn creation_failures_map_to_specific_messages() {
        assert_eq!(
            TicketError::from_creation_failure(PlatformError::from_code(MISSING_ACCESS, "x")),
            TicketError::MissingPermissions
        );
        assert_eq!(
            TicketError::from_creation_failure(PlatformError::from_code(
                INVALID_FORM_BODY,
                "Invalid Form Body: name must be 100 or fewer in length"
            )),
            TicketError::InvalidThreadName
        );
        let other = TicketError::from_creation_failure(PlatformError::Transport("reset".into()));
        assert!(matches!(other, TicketError::SetupFailed(_)));
    }

    #[test]
    fn finalize_conflict_is_shown_to_the_user() {
        let err = TicketError::FinalizeInProgress(ChannelId::new(7));
        assert_eq!(err.to_string(), "This ticket is already being finalized.");
        assert!(err.is_user_error());
    }

    #[test]
    fn claim_conflict_names_the_owner() {
        let err = TicketError::AlreadyClaimed(UserId::new(42));
        assert_eq!(err.to_string(), "🔒 This ticket is already claimed by <@42>.");
        assert!(err.is_user_error());
    }

    #[test]
    fn ban_text_names_the_banned_party() {
        let own = TicketError::Banned { reason: "scam".into() };
        assert_eq!(
            own.to_string(),
            "You are currently banned from requesting a middleman. Reason: scam"
        );
        let other = TicketError::CounterpartyBanned {
            user: UserId::new(2),
            reason: "spam".into(),
        };
        assert!(other.to_string().starts_with("The other trader (<@2>) is currently banned"));
    }

    #[test]
    fn party_add_failure_addresses_the_requester_directly() {
        let own = TicketError::party_add_failed(UserId::new(1), true);
        assert_eq!(own.to_string(), "Could not add you to the ticket. Ticket not created.");
        let other = TicketError::party_add_failed(UserId::new(2), false);
        assert!(other.to_string().contains("the other trader (<@2>)"));
    }
}
