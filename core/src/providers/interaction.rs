use super::Result;
use super::platform::{Member, UserProfile};
use crate::ids::{ChannelId, GuildId, MessageId};
use crate::message::{Modal, OutgoingMessage};
use std::collections::HashMap;
use std::future::Future;

/// What the user did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionKind {
    /// Pressed a button.
    Button,
    /// Picked from a select menu.
    Select {
        /// Chosen values.
        values: Vec<String>,
    },
    /// Submitted a modal form.
    ModalSubmit {
        /// Text input values by input id.
        fields: HashMap<String, String>,
    },
}

/// An inbound component interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interaction {
    /// Kind plus payload.
    pub kind: InteractionKind,
    /// Component id of the pressed control or submitted form.
    pub custom_id: String,
    /// The interacting account.
    pub user: UserProfile,
    /// The interacting member, when in a guild and known.
    pub member: Option<Member>,
    /// Guild, if any (feedback buttons arrive from DMs).
    pub guild_id: Option<GuildId>,
    /// Channel the control lives in.
    pub channel_id: ChannelId,
    /// Message carrying the control.
    pub message_id: Option<MessageId>,
}

impl Interaction {
    /// First selected value of a select interaction.
    #[must_use]
    pub fn selected_value(&self) -> Option<&str> {
        match &self.kind {
            InteractionKind::Select { values } => values.first().map(String::as_str),
            _ => None,
        }
    }

    /// A submitted text input, trimmed. Empty values read as `None`.
    #[must_use]
    pub fn field(&self, id: &str) -> Option<&str> {
        match &self.kind {
            InteractionKind::ModalSubmit { fields } => {
                fields.get(id).map(|v| v.trim()).filter(|v| !v.is_empty())
            }
            _ => None,
        }
    }
}

/// Acknowledgement state of an interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseState {
    /// Nothing sent yet.
    Fresh,
    /// The source message update was deferred; further messages are follow-ups.
    DeferredUpdate,
    /// A reply was deferred; it must be edited in.
    DeferredReply,
    /// A reply was sent; further messages are follow-ups.
    Replied,
}

/// Answers one interaction.
///
/// Any method may fail with an expired-interaction error once the platform's
/// response window has passed.
pub trait InteractionResponder: Send + Sync {
    /// Current acknowledgement state.
    fn state(&self) -> ResponseState;

    /// Send the initial reply.
    fn reply(&self, message: OutgoingMessage) -> impl Future<Output = Result<()>> + Send;

    /// Replace the message carrying the pressed control.
    fn update(&self, message: OutgoingMessage) -> impl Future<Output = Result<()>> + Send;

    /// Acknowledge without changing the source message.
    fn defer_update(&self) -> impl Future<Output = Result<()>> + Send;

    /// Acknowledge with a pending reply.
    fn defer_reply(&self, ephemeral: bool) -> impl Future<Output = Result<()>> + Send;

    /// Edit the initial (or deferred) reply.
    fn edit_reply(&self, message: OutgoingMessage) -> impl Future<Output = Result<()>> + Send;

    /// Send an additional message after the reply.
    fn follow_up(&self, message: OutgoingMessage) -> impl Future<Output = Result<()>> + Send;

    /// Open a modal form.
    fn show_modal(&self, modal: Modal) -> impl Future<Output = Result<()>> + Send;

    /// Delete the message carrying the pressed control.
    fn delete_source_message(&self) -> impl Future<Output = Result<()>> + Send;
}
