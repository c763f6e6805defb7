use super::TicketService;
use crate::best_effort::BestEffort;
use crate::environment::Environment;
use crate::metrics::TicketMetrics;
use crate::respond::safe_reply;
use middleman_core::environment::Clock;
use middleman_core::error::{Result, TicketError};
use middleman_core::ids::{ChannelId, UserId};
use middleman_core::message::{Embed, OutgoingMessage};
use middleman_core::model::TicketRecord;
use middleman_core::providers::{ChatPlatform, Interaction, InteractionResponder, UserProfile};
use middleman_core::registry::ClaimOutcome;
use tracing::{info, warn};

impl<E: Environment> TicketService<E> {
    /// Claim a ticket for the pressing user. First claim wins.
    ///
    /// After a successful claim the thread is renamed to the claimer, the
    /// assignment is announced and membership is narrowed to the two traders
    /// plus the claimer. Those follow-up steps are best-effort.
    ///
    /// # Errors
    ///
    /// [`TicketError::AlreadyClaimed`] when someone else got there first,
    /// [`TicketError::RecordMissing`] for untracked threads.
    pub async fn claim<R: InteractionResponder>(
        &self,
        interaction: &Interaction,
        responder: &R,
        ticket: ChannelId,
    ) -> Result<()> {
        let thread = self.ticket_thread(interaction, ticket).await?;
        let claimer = &interaction.user;

        let (id, claimer_id) = (thread.id, claimer.id);
        let record = match self
            .registry
            .update(move |s| s.try_claim(id, claimer_id))
            .await
        {
            ClaimOutcome::Claimed(record) => record,
            ClaimOutcome::AlreadyClaimed(existing) => {
                TicketMetrics::record_claim_conflict();
                info!(ticket_id = %thread.id, user_id = %claimer.id, middleman_id = %existing, "Claim lost");
                return Err(TicketError::AlreadyClaimed(existing));
            }
            ClaimOutcome::NotTracked => return Err(TicketError::RecordMissing(thread.id)),
        };
        TicketMetrics::record_claimed();
        info!(ticket_id = %thread.id, middleman_id = %claimer.id, "Ticket claimed");

        let platform = self.env.platform();
        platform
            .rename_thread(thread.id, &claimer.username)
            .await
            .best_effort("rename claimed ticket");
        platform
            .send_message(thread.id, OutgoingMessage::embed(self.assignment_embed(claimer)))
            .await
            .best_effort("announce middleman");
        self.restrict_to_participants(thread.id, &record, claimer.id).await;

        safe_reply(
            responder,
            OutgoingMessage::text(
                "✅ You have claimed this ticket! Only you and the two traders can type here now.",
            )
            .ephemeral(),
        )
        .await?;
        Ok(())
    }

    fn assignment_embed(&self, claimer: &UserProfile) -> Embed {
        Embed::titled("**| Middleman Assigned**")
            .description(format!("**{}** is now your middleman.", claimer.tag()))
            .field("Username", claimer.username.clone(), true)
            .field("Discord ID", claimer.id.to_string(), true)
            .timestamp(self.env.clock().now())
    }

    /// Remove every non-bot member outside the traders and the middleman, then
    /// make sure those three are in.
    async fn restrict_to_participants(&self, thread: ChannelId, record: &TicketRecord, middleman: UserId) {
        let platform = self.env.platform();
        let allowed = [record.ticket_creator_id, record.other_trader_id, middleman];
        match platform.thread_members(thread).await {
            Ok(members) => {
                for member in members
                    .iter()
                    .filter(|m| !m.is_bot && !allowed.contains(&m.user_id))
                {
                    platform
                        .remove_thread_member(thread, member.user_id, "Restrict typing to traders + MM")
                        .await
                        .best_effort("remove outsider from claimed ticket");
                }
            }
            Err(e) => warn!(ticket_id = %thread, error = %e, "Could not list ticket members"),
        }
        for user in allowed {
            platform
                .add_thread_member(thread, user)
                .await
                .best_effort("add participant to claimed ticket");
        }
    }
}
