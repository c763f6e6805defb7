//! Component ids.
//!
//! Buttons, menus and forms carry a string id that comes back with every
//! interaction. Ids that address a ticket embed its thread id (and sometimes a
//! user id) after a fixed prefix; this module is the single place that knows
//! those layouts.

use crate::ids::{ChannelId, UserId};
use std::fmt;

const REQUEST_MIDDLEMAN: &str = "request_middleman_button";
const TIER_SELECT: &str = "mm_tier_select";
const SHOW_REQUEST_FORM: &str = "show_mm_modal_";
const SUBMIT_REQUEST_FORM: &str = "mm_request_modal_";
const CLAIM: &str = "claim_ticket_";
const CLOSE: &str = "close_ticket_";
const FINALIZE: &str = "finish_log_ticket_";
const REOPEN: &str = "final_reopen_ticket_";
const DELETE_ONLY: &str = "final_delete_ticket_";
const PROVIDE_FEEDBACK: &str = "provide_feedback_";
const SUBMIT_FEEDBACK: &str = "submit_feedback_";
const NO_MIDDLEMAN: &str = "none";

/// Text-input ids of the trade request form.
pub mod request_form {
    /// Counterparty (id, mention, username or display name).
    pub const TRADER: &str = "trader_id_input";
    /// What the requester gives.
    pub const YOUR_TRADE: &str = "your_trade_input";
    /// What the counterparty gives.
    pub const OTHER_TRADE: &str = "other_trader_trade_input";
}

/// Text-input ids of the feedback form.
pub mod feedback_form {
    /// Short rating.
    pub const RATING: &str = "feedback_rating";
    /// Free comments.
    pub const COMMENTS: &str = "feedback_comments";
    /// Improvement suggestions.
    pub const IMPROVEMENT: &str = "feedback_improvement";
}

/// A decoded component id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ComponentId {
    /// Panel button that starts a request.
    RequestMiddleman,
    /// Tier drop-down.
    TierSelect,
    /// Button that opens the request form for a tier value.
    ShowRequestForm {
        /// Tier value (not key).
        tier_value: String,
    },
    /// Submitted request form for a tier value.
    SubmitRequestForm {
        /// Tier value (not key).
        tier_value: String,
    },
    /// Claim a ticket.
    Claim {
        /// Ticket thread.
        ticket: ChannelId,
    },
    /// Close a ticket.
    Close {
        /// Ticket thread.
        ticket: ChannelId,
    },
    /// Log the middleman point and delete the thread.
    Finalize {
        /// Ticket thread.
        ticket: ChannelId,
        /// Who pressed close.
        closer: UserId,
    },
    /// Bring a closed ticket back.
    Reopen {
        /// Ticket thread.
        ticket: ChannelId,
    },
    /// Delete without logging.
    DeleteOnly {
        /// Ticket thread.
        ticket: ChannelId,
    },
    /// DM button that opens the feedback form.
    ProvideFeedback {
        /// Ticket thread (may already be deleted).
        ticket: ChannelId,
        /// Rated middleman, if any.
        middleman: Option<UserId>,
    },
    /// Submitted feedback form.
    SubmitFeedback {
        /// Ticket thread (may already be deleted).
        ticket: ChannelId,
        /// Rated middleman, if any.
        middleman: Option<UserId>,
    },
}

impl ComponentId {
    /// Decode an id. Unknown or malformed ids yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            REQUEST_MIDDLEMAN => return Some(Self::RequestMiddleman),
            TIER_SELECT => return Some(Self::TierSelect),
            _ => {}
        }
        if let Some(rest) = raw.strip_prefix(SHOW_REQUEST_FORM) {
            return Some(Self::ShowRequestForm {
                tier_value: rest.to_string(),
            });
        }
        if let Some(rest) = raw.strip_prefix(SUBMIT_REQUEST_FORM) {
            return Some(Self::SubmitRequestForm {
                tier_value: rest.to_string(),
            });
        }
        if let Some(rest) = raw.strip_prefix(FINALIZE) {
            let (ticket, closer) = rest.split_once('_')?;
            return Some(Self::Finalize {
                ticket: ticket.parse().ok()?,
                closer: closer.parse().ok()?,
            });
        }
        if let Some(rest) = raw.strip_prefix(REOPEN) {
            return Some(Self::Reopen {
                ticket: rest.parse().ok()?,
            });
        }
        if let Some(rest) = raw.strip_prefix(DELETE_ONLY) {
            return Some(Self::DeleteOnly {
                ticket: rest.parse().ok()?,
            });
        }
        if let Some(rest) = raw.strip_prefix(CLAIM) {
            return Some(Self::Claim {
                ticket: rest.parse().ok()?,
            });
        }
        if let Some(rest) = raw.strip_prefix(CLOSE) {
            return Some(Self::Close {
                ticket: rest.parse().ok()?,
            });
        }
        if let Some(rest) = raw.strip_prefix(PROVIDE_FEEDBACK) {
            let (ticket, middleman) = parse_feedback_target(rest)?;
            return Some(Self::ProvideFeedback { ticket, middleman });
        }
        if let Some(rest) = raw.strip_prefix(SUBMIT_FEEDBACK) {
            let (ticket, middleman) = parse_feedback_target(rest)?;
            return Some(Self::SubmitFeedback { ticket, middleman });
        }
        None
    }

    /// The thread this id addresses, for ticket-scoped ids.
    #[must_use]
    pub const fn ticket(&self) -> Option<ChannelId> {
        match self {
            Self::Claim { ticket }
            | Self::Close { ticket }
            | Self::Finalize { ticket, .. }
            | Self::Reopen { ticket }
            | Self::DeleteOnly { ticket }
            | Self::ProvideFeedback { ticket, .. }
            | Self::SubmitFeedback { ticket, .. } => Some(*ticket),
            _ => None,
        }
    }

    /// Whether banned users are stopped before this component is handled.
    #[must_use]
    pub const fn is_request_step(&self) -> bool {
        matches!(
            self,
            Self::RequestMiddleman
                | Self::TierSelect
                | Self::ShowRequestForm { .. }
                | Self::SubmitRequestForm { .. }
        )
    }
}

fn parse_feedback_target(rest: &str) -> Option<(ChannelId, Option<UserId>)> {
    let (ticket, middleman) = rest.split_once('_')?;
    let middleman = if middleman == NO_MIDDLEMAN {
        None
    } else {
        Some(middleman.parse().ok()?)
    };
    Some((ticket.parse().ok()?, middleman))
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = |m: &Option<UserId>| m.map_or_else(|| NO_MIDDLEMAN.to_string(), |u| u.to_string());
        match self {
            Self::RequestMiddleman => f.write_str(REQUEST_MIDDLEMAN),
            Self::TierSelect => f.write_str(TIER_SELECT),
            Self::ShowRequestForm { tier_value } => write!(f, "{SHOW_REQUEST_FORM}{tier_value}"),
            Self::SubmitRequestForm { tier_value } => {
                write!(f, "{SUBMIT_REQUEST_FORM}{tier_value}")
            }
            Self::Claim { ticket } => write!(f, "{CLAIM}{ticket}"),
            Self::Close { ticket } => write!(f, "{CLOSE}{ticket}"),
            Self::Finalize { ticket, closer } => write!(f, "{FINALIZE}{ticket}_{closer}"),
            Self::Reopen { ticket } => write!(f, "{REOPEN}{ticket}"),
            Self::DeleteOnly { ticket } => write!(f, "{DELETE_ONLY}{ticket}"),
            Self::ProvideFeedback { ticket, middleman } => {
                write!(f, "{PROVIDE_FEEDBACK}{ticket}_{}", target(middleman))
            }
            Self::SubmitFeedback { ticket, middleman } => {
                write!(f, "{SUBMIT_FEEDBACK}{ticket}_{}", target(middleman))
            }
        }
    }
}
