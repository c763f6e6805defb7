use super::TicketService;
use crate::best_effort::BestEffort;
use crate::environment::Environment;
use crate::metrics::TicketMetrics;
use crate::respond::{acknowledge, safe_reply};
use crate::scoring;
use crate::transcript::{self, ArchiveRequest};
use middleman_core::authority::{Authority, is_staff};
use middleman_core::component::ComponentId;
use middleman_core::environment::Clock;
use middleman_core::error::Result;
use middleman_core::ids::{ChannelId, GuildId};
use middleman_core::message::{Button, ButtonStyle, Embed, OutgoingMessage};
use middleman_core::model::LeaderboardKind;
use middleman_core::providers::{ChatPlatform, Interaction, InteractionResponder};
use tracing::{info, warn};

impl<E: Environment> TicketService<E> {
    /// Close a ticket.
    ///
    /// Archives the transcript, awards trader points, removes everyone who is
    /// not staff, posts the terminal controls and drops the active record.
    /// Each step is isolated: a failure is logged and the rest still runs.
    ///
    /// # Errors
    ///
    /// Authority and thread failures before anything is changed.
    pub async fn close<R: InteractionResponder>(
        &self,
        interaction: &Interaction,
        responder: &R,
        ticket: ChannelId,
    ) -> Result<()> {
        let thread = self.ticket_thread(interaction, ticket).await?;
        self.authorize(interaction, Authority::Manage, "close this ticket")
            .await?;
        acknowledge(responder.defer_update()).await?;

        let platform = self.env.platform();
        let guild = self.guild(interaction);
        let closer = &interaction.user;
        let now = self.env.clock().now();
        let parties = self.ticket_parties(thread.id).await;

        let archived = transcript::archive(
            platform,
            self.env.transcripts(),
            ArchiveRequest {
                ticket: &thread,
                parties,
                closer,
                log_channel: self.config.transcript_log_channel_id,
                viewer_url: &self.config.transcript_viewer_url,
                now,
            },
        )
        .await;
        info!(ticket_id = %thread.id, outcome = ?archived, "Transcript step finished");

        scoring::award_points(
            &self.registry,
            self.env.leaderboards(),
            self.board(LeaderboardKind::Trader, guild),
            &parties.distinct(),
        )
        .await;

        self.remove_non_staff(thread.id, guild).await;

        let closed_embed = Embed::titled("Ticket Closed & Transcripted")
            .description(format!(
                "Ticket closed by {}.\n\n📄 **Transcript saved automatically**\n🏆 **Trader points awarded**",
                closer.id.mention()
            ))
            .field("✅ Log MM Point & Delete", "Award MM point to staff and delete ticket.", true)
            .field("🔄 Reopen", "Reopen the ticket for users.", true)
            .field("❌ Delete Only", "Delete ticket without MM points.", true)
            .timestamp(now);
        let controls = OutgoingMessage::embed(closed_embed)
            .with_button(
                Button::new(
                    ComponentId::Finalize {
                        ticket: thread.id,
                        closer: closer.id,
                    }
                    .to_string(),
                    "Log MM Point & Delete",
                    ButtonStyle::Success,
                )
                .emoji("✅"),
            )
            .with_button(
                Button::new(
                    ComponentId::Reopen { ticket: thread.id }.to_string(),
                    "Reopen",
                    ButtonStyle::Primary,
                )
                .emoji("♻️"),
            )
            .with_button(
                Button::new(
                    ComponentId::DeleteOnly { ticket: thread.id }.to_string(),
                    "Delete Only",
                    ButtonStyle::Danger,
                )
                .emoji("❌"),
            );
        let posted = platform
            .send_message(thread.id, controls)
            .await
            .best_effort("post terminal controls");

        if self.registry.remove_ticket(thread.id).await.is_some() {
            info!(ticket_id = %thread.id, "Ticket removed from active tracking");
        }
        TicketMetrics::record_closed();
        info!(ticket_id = %thread.id, user_id = %closer.id, "Ticket closed");

        if posted.is_none() {
            safe_reply(
                responder,
                OutgoingMessage::text("❌ There was an error closing the ticket.").ephemeral(),
            )
            .await?;
        }
        Ok(())
    }

    /// Remove every member who is neither a bot nor staff.
    ///
    /// Members that can no longer be looked up are left alone.
    async fn remove_non_staff(&self, thread: ChannelId, guild: GuildId) {
        let platform = self.env.platform();
        let members = match platform.thread_members(thread).await {
            Ok(members) => members,
            Err(e) => {
                warn!(ticket_id = %thread, error = %e, "Could not list ticket members");
                return;
            }
        };
        for thread_member in members.iter().filter(|m| !m.is_bot) {
            let Some(member) = platform
                .member(guild, thread_member.user_id)
                .await
                .best_effort("look up ticket member")
                .flatten()
            else {
                continue;
            };
            if member.user.bot || is_staff(&member.roles, &self.config.staff_roles) {
                continue;
            }
            platform
                .remove_thread_member(thread, member.user.id, "Ticket closed")
                .await
                .best_effort("remove member from closed ticket");
        }
    }
}
