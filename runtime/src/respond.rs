//! Interaction acknowledgement that tolerates expiry.
//!
//! A user who waits past the platform's response window has already moved
//! on. Every helper here turns the expired-interaction error into a warning
//! and reports `false` instead of failing.

use middleman_core::error::{PlatformError, TicketError};
use middleman_core::message::OutgoingMessage;
use middleman_core::providers::{InteractionResponder, ResponseState};
use std::future::Future;
use tracing::warn;

/// Outcome of a response step that may hit an expired interaction.
async fn tolerate_expiry(
    step: &'static str,
    call: impl Future<Output = Result<(), PlatformError>>,
) -> Result<bool, PlatformError> {
    match call.await {
        Ok(()) => Ok(true),
        Err(e) if e.is_expired() => {
            warn!(step, "Interaction expired");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Reply, edit the deferred reply or follow up, whichever fits the state.
///
/// # Errors
///
/// Returns non-expiry platform failures.
pub async fn safe_reply<R: InteractionResponder>(
    responder: &R,
    message: OutgoingMessage,
) -> Result<bool, PlatformError> {
    match responder.state() {
        ResponseState::Fresh => tolerate_expiry("reply", responder.reply(message)).await,
        ResponseState::DeferredReply => {
            tolerate_expiry("edit_reply", responder.edit_reply(message)).await
        }
        ResponseState::DeferredUpdate | ResponseState::Replied => {
            tolerate_expiry("follow_up", responder.follow_up(message)).await
        }
    }
}

/// Replace the source message.
///
/// # Errors
///
/// Returns non-expiry platform failures.
pub async fn safe_update<R: InteractionResponder>(
    responder: &R,
    message: OutgoingMessage,
) -> Result<bool, PlatformError> {
    tolerate_expiry("update", responder.update(message)).await
}

/// Edit the reply in place.
///
/// # Errors
///
/// Returns non-expiry platform failures.
pub async fn safe_edit_reply<R: InteractionResponder>(
    responder: &R,
    message: OutgoingMessage,
) -> Result<bool, PlatformError> {
    tolerate_expiry("edit_reply", responder.edit_reply(message)).await
}

/// Acknowledge before long-running work.
///
/// # Errors
///
/// [`TicketError::InteractionExpired`] when the window has passed, so the
/// caller abandons the transition silently.
pub async fn acknowledge(
    call: impl Future<Output = Result<(), PlatformError>>,
) -> Result<(), TicketError> {
    call.await.map_err(|e| {
        if e.is_expired() {
            TicketError::InteractionExpired
        } else {
            TicketError::Platform(e)
        }
    })
}
