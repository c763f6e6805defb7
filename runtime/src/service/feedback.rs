use super::TicketService;
use crate::best_effort::BestEffort;
use crate::environment::Environment;
use crate::respond::{acknowledge, safe_reply};
use crate::scoring::{self, FeedbackSubmission};
use middleman_core::component::{ComponentId, feedback_form};
use middleman_core::environment::Clock;
use middleman_core::error::Result;
use middleman_core::ids::{ChannelId, UserId};
use middleman_core::message::{Embed, Modal, OutgoingMessage, TextInput, TextInputStyle};
use middleman_core::model::{FeedbackEntry, NOT_PROVIDED};
use middleman_core::providers::{ChatPlatform, Interaction, InteractionResponder};
use tracing::info;

fn feedback_form(ticket: ChannelId, middleman: Option<UserId>) -> Modal {
    let input = |id: &str, label: &str, style, placeholder: &str, required| TextInput {
        custom_id: id.to_string(),
        label: label.to_string(),
        style,
        placeholder: placeholder.to_string(),
        required,
    };
    Modal {
        custom_id: ComponentId::SubmitFeedback { ticket, middleman }.to_string(),
        title: "Middleman Feedback".to_string(),
        inputs: vec![
            input(
                feedback_form::RATING,
                "Rate experience (e.g., 1-5, Good, Bad)",
                TextInputStyle::Short,
                "e.g., 5/5, Excellent, or a brief rating",
                true,
            ),
            input(
                feedback_form::COMMENTS,
                "Additional comments about your experience?",
                TextInputStyle::Paragraph,
                "Any specific details you'd like to share?",
                false,
            ),
            input(
                feedback_form::IMPROVEMENT,
                "How can our middleman service improve?",
                TextInputStyle::Paragraph,
                "Any suggestions for us?",
                false,
            ),
        ],
    }
}

impl<E: Environment> TicketService<E> {
    /// Open the feedback form from a DM button.
    ///
    /// # Errors
    ///
    /// Platform failures other than an expired interaction.
    pub async fn show_feedback_form<R: InteractionResponder>(
        &self,
        responder: &R,
        ticket: ChannelId,
        middleman: Option<UserId>,
    ) -> Result<()> {
        acknowledge(responder.show_modal(feedback_form(ticket, middleman))).await
    }

    /// Record a feedback submission, thank the user and notify the mod log.
    ///
    /// The ticket thread may already be gone; feedback is keyed by its id.
    ///
    /// # Errors
    ///
    /// Platform failures while answering the user.
    pub async fn submit_feedback<R: InteractionResponder>(
        &self,
        interaction: &Interaction,
        responder: &R,
        ticket: ChannelId,
        middleman: Option<UserId>,
    ) -> Result<()> {
        let submission = FeedbackSubmission {
            ticket,
            middleman,
            rating: interaction
                .field(feedback_form::RATING)
                .unwrap_or(NOT_PROVIDED)
                .to_string(),
            comments: interaction.field(feedback_form::COMMENTS).map(str::to_string),
            suggestions: interaction
                .field(feedback_form::IMPROVEMENT)
                .map(str::to_string),
        };
        let entry = scoring::record_feedback(
            &self.registry,
            self.env.clock(),
            &interaction.user,
            submission,
        )
        .await;

        let thanks = Embed::titled("📝 Feedback Submitted!")
            .description(
                "Thank you for your valuable feedback. It helps us improve our middleman service!",
            )
            .timestamp(entry.timestamp);
        safe_reply(responder, OutgoingMessage::embed(thanks).ephemeral()).await?;

        self.notify_feedback(ticket, &entry).await;
        Ok(())
    }

    async fn notify_feedback(&self, ticket: ChannelId, entry: &FeedbackEntry) {
        let Some(channel) = self.config.server_mod_log_channel_id else {
            return;
        };
        let platform = self.env.platform();
        let rated = match entry.middleman_id {
            Some(id) => platform
                .user(id)
                .await
                .best_effort("look up rated middleman")
                .flatten()
                .map_or_else(|| format!("ID: {id}"), |u| u.tag()),
            None => NOT_PROVIDED.to_string(),
        };
        let notification = Embed::titled("💬 New Ticket Feedback Received")
            .field("Ticket ID", format!("`{ticket}`"), true)
            .field(
                "Submitted By",
                format!("{} ({})", entry.submitter_tag, entry.submitter_id.mention()),
                true,
            )
            .field("Middleman Rated", rated, true)
            .field("Rating", entry.rating.clone(), false)
            .field("Comments", entry.comments.clone(), false)
            .field("Improvement Suggestions", entry.improvement_suggestions.clone(), false)
            .timestamp(self.env.clock().now());
        if platform
            .send_message(channel, OutgoingMessage::embed(notification))
            .await
            .best_effort("post feedback notification")
            .is_some()
        {
            info!(ticket_id = %ticket, user_id = %entry.submitter_id, "Feedback notification posted");
        }
    }
}
