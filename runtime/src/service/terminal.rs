//! Actions on a closed ticket: finalize, reopen, delete without logging.

use super::{TicketService, close_button};
use crate::best_effort::BestEffort;
use crate::environment::Environment;
use crate::metrics::TicketMetrics;
use crate::respond::{acknowledge, safe_edit_reply, safe_reply};
use crate::scoring;
use middleman_core::authority::{Authority, is_staff};
use middleman_core::component::ComponentId;
use middleman_core::environment::Clock;
use middleman_core::error::{Result, TicketError};
use middleman_core::ids::{ChannelId, UserId};
use middleman_core::message::{Button, ButtonStyle, Embed, OutgoingMessage, colors};
use middleman_core::model::LeaderboardKind;
use middleman_core::providers::{
    ChatPlatform, Interaction, InteractionResponder, ModLogEntry, ModerationLog,
};
use tracing::info;

impl<E: Environment> TicketService<E> {
    /// Log the middleman point, request feedback and delete the thread.
    ///
    /// The closer recorded in the control is re-fetched and earns the point
    /// only if they hold a staff role right now. The ticket stays reserved
    /// until the thread is deleted, so a second press is rejected.
    ///
    /// # Errors
    ///
    /// Authority and thread failures before anything is changed.
    pub async fn finalize<R: InteractionResponder>(
        &self,
        interaction: &Interaction,
        responder: &R,
        ticket: ChannelId,
        closer: UserId,
    ) -> Result<()> {
        let thread = self.ticket_thread(interaction, ticket).await?;
        self.authorize(interaction, Authority::Manage, "complete this action")
            .await?;
        let mut guard = self.finalize_guard();
        if !guard.reserve(thread.id) {
            return Err(TicketError::FinalizeInProgress(thread.id));
        }
        acknowledge(responder.defer_reply(true)).await?;

        let platform = self.env.platform();
        let guild = self.guild(interaction);
        let closer_member = platform
            .member(guild, closer)
            .await
            .best_effort("fetch closer")
            .flatten();

        if let Some(member) = &closer_member {
            if is_staff(&member.roles, &self.config.staff_roles) {
                scoring::award_point(
                    &self.registry,
                    self.env.leaderboards(),
                    self.board(LeaderboardKind::Middleman, guild),
                    closer,
                )
                .await;
            } else {
                info!(ticket_id = %thread.id, user_id = %closer, "Closer is not staff, no middleman point");
            }
        }

        let middleman = closer_member.as_ref().map(|m| m.user.id);
        let handled_by = closer_member
            .as_ref()
            .map(|m| format!("handled by **{}** ", m.user.tag()))
            .unwrap_or_default();
        let request = OutgoingMessage::embed(
            Embed::titled("Ticket Closed - Feedback Request")
                .description(format!(
                    "Your ticket `{}` {handled_by}has been closed.\n\nWe'd appreciate your feedback on your experience! Click the button below to share your thoughts.",
                    thread.name
                ))
                .timestamp(self.env.clock().now()),
        )
        .with_button(Button::new(
            ComponentId::ProvideFeedback {
                ticket: thread.id,
                middleman,
            }
            .to_string(),
            "Provide Feedback",
            ButtonStyle::Primary,
        ));
        for party in self.ticket_parties(thread.id).await.distinct() {
            platform
                .send_direct_message(party, request.clone())
                .await
                .best_effort("send feedback request");
        }

        self.registry.persist().await;
        TicketMetrics::record_finalized();
        info!(ticket_id = %thread.id, user_id = %interaction.user.id, "Ticket finalized");
        safe_edit_reply(
            responder,
            OutgoingMessage::text("✅ MM point logged, feedback sent. Deleting ticket now..."),
        )
        .await?;

        tokio::time::sleep(self.config.delete_delay()).await;
        platform
            .delete_channel(thread.id, &format!("Ticket finished by {}.", interaction.user.tag()))
            .await
            .best_effort("delete finished ticket");
        Ok(())
    }

    /// Bring the traders back into a closed ticket.
    ///
    /// The registry record is not restored.
    ///
    /// # Errors
    ///
    /// Authority and thread failures, or a failure to post the new controls.
    pub async fn reopen<R: InteractionResponder>(
        &self,
        interaction: &Interaction,
        responder: &R,
        ticket: ChannelId,
    ) -> Result<()> {
        self.authorize(interaction, Authority::Elevated, "reopen tickets")
            .await?;
        let thread = self.ticket_thread(interaction, ticket).await?;
        acknowledge(responder.defer_update()).await?;

        let platform = self.env.platform();
        for party in self.ticket_parties(thread.id).await.distinct() {
            platform
                .add_thread_member(thread.id, party)
                .await
                .best_effort("re-add trader");
        }
        let notice = Embed::titled("Ticket Reopened").description(format!(
            "This ticket has been reopened by {}. The original traders have been re-added.",
            interaction.user.id.mention()
        ));
        platform
            .send_message(
                thread.id,
                OutgoingMessage::embed(notice).with_button(close_button(thread.id)),
            )
            .await?;
        responder
            .delete_source_message()
            .await
            .best_effort("delete terminal controls");
        info!(ticket_id = %thread.id, user_id = %interaction.user.id, "Ticket reopened");
        Ok(())
    }

    /// Delete a closed ticket without logging points or requesting feedback.
    ///
    /// # Errors
    ///
    /// Authority and thread failures before anything is changed.
    pub async fn delete_only<R: InteractionResponder>(
        &self,
        interaction: &Interaction,
        responder: &R,
        ticket: ChannelId,
    ) -> Result<()> {
        self.authorize(interaction, Authority::Administrator, "delete tickets")
            .await?;
        let thread = self.ticket_thread(interaction, ticket).await?;
        let replied = safe_reply(
            responder,
            OutgoingMessage::text(format!(
                "Ticket **{}** is being permanently deleted without logging points...",
                thread.name
            ))
            .ephemeral(),
        )
        .await?;
        if !replied {
            return Ok(());
        }

        let actor = &interaction.user;
        self.env
            .mod_log()
            .record(ModLogEntry {
                action: "Ticket Thread Deleted".to_string(),
                description: format!(
                    "Ticket thread **{}** (`{}`) was deleted via button.",
                    thread.name, thread.id
                ),
                color: colors::TOMATO,
                actor: actor.id,
                note: Some(format!("Deleted by {}.", actor.tag())),
            })
            .await
            .best_effort("record deletion");
        TicketMetrics::record_deleted();
        info!(ticket_id = %thread.id, user_id = %actor.id, "Ticket deleted without logging");

        tokio::time::sleep(self.config.delete_delay()).await;
        self.env
            .platform()
            .delete_channel(thread.id, &format!("Ticket deleted by {}", actor.tag()))
            .await
            .best_effort("delete ticket");
        Ok(())
    }
}
