//! Interaction routing.
//!
//! Decodes the component id, applies the ban gate to request steps and hands
//! the interaction to the matching [`TicketService`] method. Errors come back
//! here to be answered:
//!
//! - user errors are shown to the user, ephemerally
//! - an expired interaction is dropped silently
//! - anything else is logged and answered with a generic notice

use crate::environment::Environment;
use crate::respond::{safe_reply, safe_update};
use crate::service::TicketService;
use middleman_core::component::ComponentId;
use middleman_core::error::{GENERIC_FAILURE, TicketError};
use middleman_core::message::OutgoingMessage;
use middleman_core::providers::{Interaction, InteractionResponder};
use tracing::{debug, error, info, warn};

/// What became of one interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// The transition ran to completion.
    Handled,
    /// The user was told why nothing happened.
    Rejected(TicketError),
    /// Something unexpected failed; the user got a generic notice.
    Failed(TicketError),
    /// The interaction expired before it could be acknowledged.
    Expired,
    /// Not a component this service owns, or used outside a guild.
    Ignored,
}

impl<E: Environment> TicketService<E> {
    /// Route one component interaction.
    pub async fn handle<R: InteractionResponder>(&self, interaction: &Interaction, responder: &R) -> Dispatch {
        let Some(component) = ComponentId::parse(&interaction.custom_id) else {
            debug!(custom_id = %interaction.custom_id, "Ignoring unknown component");
            return Dispatch::Ignored;
        };
        let dm_allowed = matches!(
            component,
            ComponentId::ProvideFeedback { .. } | ComponentId::SubmitFeedback { .. }
        );
        if interaction.guild_id.is_none() && !dm_allowed {
            return Dispatch::Ignored;
        }
        info!(
            custom_id = %interaction.custom_id,
            user_id = %interaction.user.id,
            channel_id = %interaction.channel_id,
            "Handling interaction"
        );

        let result = match self.gate(&component, interaction) {
            Err(e) => Err(e),
            Ok(()) => self.dispatch(&component, interaction, responder).await,
        };
        match result {
            Ok(()) => Dispatch::Handled,
            Err(e) if e.is_expired() => {
                warn!(custom_id = %interaction.custom_id, user_id = %interaction.user.id, "Interaction expired");
                Dispatch::Expired
            }
            Err(e) if e.is_user_error() => {
                debug!(custom_id = %interaction.custom_id, reason = %e, "Rejected");
                self.answer(&component, responder, e.to_string()).await;
                Dispatch::Rejected(e)
            }
            Err(e) => {
                error!(
                    custom_id = %interaction.custom_id,
                    user_id = %interaction.user.id,
                    error = %e,
                    "Interaction failed"
                );
                self.answer(&component, responder, failure_notice(&component).to_string())
                    .await;
                Dispatch::Failed(e)
            }
        }
    }

    /// Banned users are stopped at every request step.
    fn gate(&self, component: &ComponentId, interaction: &Interaction) -> Result<(), TicketError> {
        if !component.is_request_step() {
            return Ok(());
        }
        match self.ban_reason(interaction.user.id) {
            Some(reason) => Err(TicketError::Banned { reason }),
            None => Ok(()),
        }
    }

    async fn dispatch<R: InteractionResponder>(
        &self,
        component: &ComponentId,
        interaction: &Interaction,
        responder: &R,
    ) -> Result<(), TicketError> {
        match component {
            ComponentId::RequestMiddleman => self.request_middleman(interaction, responder).await,
            ComponentId::TierSelect => self.select_tier(interaction, responder).await,
            ComponentId::ShowRequestForm { tier_value } => {
                self.show_request_form(interaction, responder, tier_value).await
            }
            ComponentId::SubmitRequestForm { tier_value } => {
                self.create_ticket(interaction, responder, tier_value).await
            }
            ComponentId::Claim { ticket } => self.claim(interaction, responder, *ticket).await,
            ComponentId::Close { ticket } => self.close(interaction, responder, *ticket).await,
            ComponentId::Finalize { ticket, closer } => {
                self.finalize(interaction, responder, *ticket, *closer).await
            }
            ComponentId::Reopen { ticket } => self.reopen(interaction, responder, *ticket).await,
            ComponentId::DeleteOnly { ticket } => {
                self.delete_only(interaction, responder, *ticket).await
            }
            ComponentId::ProvideFeedback { ticket, middleman } => {
                self.show_feedback_form(responder, *ticket, *middleman).await
            }
            ComponentId::SubmitFeedback { ticket, middleman } => {
                self.submit_feedback(interaction, responder, *ticket, *middleman)
                    .await
            }
        }
    }

    /// Tell the user, in whatever way the interaction still allows.
    async fn answer<R: InteractionResponder>(&self, component: &ComponentId, responder: &R, text: String) {
        let replaces_source = matches!(
            component,
            ComponentId::TierSelect | ComponentId::ShowRequestForm { .. }
        );
        let sent = if replaces_source {
            safe_update(responder, OutgoingMessage::text(text)).await
        } else {
            safe_reply(responder, OutgoingMessage::text(text).ephemeral()).await
        };
        if let Err(e) = sent {
            error!(error = %e, "Could not answer interaction");
        }
    }
}

/// Generic notice for unexpected failures, per action.
fn failure_notice(component: &ComponentId) -> &'static str {
    match component {
        ComponentId::Close { .. } => "❌ There was an error closing the ticket.",
        ComponentId::Finalize { .. } => "❌ An error occurred while finishing the ticket.",
        ComponentId::SubmitRequestForm { .. } => {
            "An error occurred while creating the ticket. Please try again."
        }
        ComponentId::ProvideFeedback { .. } => {
            "Sorry, an error occurred while trying to open the feedback form."
        }
        ComponentId::SubmitFeedback { .. } => "Sorry, there was an error submitting your feedback.",
        _ => GENERIC_FAILURE,
    }
}
