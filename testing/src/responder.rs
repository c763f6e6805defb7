//! Recording interaction responder.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use middleman_core::error::{PlatformError, UNKNOWN_INTERACTION};
use middleman_core::message::{Modal, OutgoingMessage};
use middleman_core::providers::{InteractionResponder, ResponseState, Result};
use std::sync::Mutex;

/// One call made on a [`RecordingResponder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// Initial reply.
    Reply(OutgoingMessage),
    /// Source message replaced.
    Update(OutgoingMessage),
    /// Update deferred.
    DeferUpdate,
    /// Reply deferred.
    DeferReply {
        /// Whether the pending reply is ephemeral.
        ephemeral: bool,
    },
    /// Reply edited.
    EditReply(OutgoingMessage),
    /// Follow-up sent.
    FollowUp(OutgoingMessage),
    /// Modal opened.
    Modal(Modal),
    /// Source message deleted.
    DeleteSource,
}

impl Response {
    /// The message carried by this call, if any.
    #[must_use]
    pub const fn message(&self) -> Option<&OutgoingMessage> {
        match self {
            Self::Reply(m) | Self::Update(m) | Self::EditReply(m) | Self::FollowUp(m) => Some(m),
            _ => None,
        }
    }
}

struct Inner {
    state: ResponseState,
    calls: Vec<Response>,
    expired: bool,
}

/// [`InteractionResponder`] that records every call and tracks the
/// acknowledgement state the way the platform does.
///
/// # Example
///
/// ```
/// use middleman_testing::responder::RecordingResponder;
///
/// let responder = RecordingResponder::new();
/// assert!(responder.calls().is_empty());
/// ```
pub struct RecordingResponder {
    inner: Mutex<Inner>,
}

impl Default for RecordingResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingResponder {
    /// Fresh, unacknowledged interaction.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ResponseState::Fresh,
                calls: Vec::new(),
                expired: false,
            }),
        }
    }

    /// An interaction whose response window already closed. Every call fails.
    #[must_use]
    pub const fn expired() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: ResponseState::Fresh,
                calls: Vec::new(),
                expired: true,
            }),
        }
    }

    /// Calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Response> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Text of every message sent through this responder, in order.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(Response::message)
            .filter_map(|m| {
                m.content
                    .clone()
                    .or_else(|| m.embeds.first().and_then(|e| e.title.clone()))
            })
            .collect()
    }

    /// Text of the last message sent.
    #[must_use]
    pub fn last_text(&self) -> Option<String> {
        self.texts().pop()
    }

    /// Modals opened so far.
    #[must_use]
    pub fn modals(&self) -> Vec<Modal> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Response::Modal(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Response, next: Option<ResponseState>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.expired {
            return Err(PlatformError::from_code(UNKNOWN_INTERACTION, "Unknown interaction"));
        }
        inner.calls.push(call);
        if let Some(state) = next {
            inner.state = state;
        }
        Ok(())
    }
}

impl InteractionResponder for RecordingResponder {
    fn state(&self) -> ResponseState {
        self.inner.lock().unwrap().state
    }

    async fn reply(&self, message: OutgoingMessage) -> Result<()> {
        self.record(Response::Reply(message), Some(ResponseState::Replied))
    }

    async fn update(&self, message: OutgoingMessage) -> Result<()> {
        self.record(Response::Update(message), Some(ResponseState::Replied))
    }

    async fn defer_update(&self) -> Result<()> {
        self.record(Response::DeferUpdate, Some(ResponseState::DeferredUpdate))
    }

    async fn defer_reply(&self, ephemeral: bool) -> Result<()> {
        self.record(
            Response::DeferReply { ephemeral },
            Some(ResponseState::DeferredReply),
        )
    }

    async fn edit_reply(&self, message: OutgoingMessage) -> Result<()> {
        self.record(Response::EditReply(message), None)
    }

    async fn follow_up(&self, message: OutgoingMessage) -> Result<()> {
        self.record(Response::FollowUp(message), None)
    }

    async fn show_modal(&self, modal: Modal) -> Result<()> {
        self.record(Response::Modal(modal), Some(ResponseState::Replied))
    }

    async fn delete_source_message(&self) -> Result<()> {
        self.record(Response::DeleteSource, None)
    }
}
