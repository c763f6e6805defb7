//! Requesting a middleman: the panel button, the tier menu, the trade form
//! and ticket creation.

use super::{TicketService, close_button};
use crate::best_effort::BestEffort;
use crate::environment::Environment;
use crate::metrics::TicketMetrics;
use crate::resolver::UserResolver;
use crate::respond::{acknowledge, safe_edit_reply, safe_reply, safe_update};
use middleman_core::component::{ComponentId, request_form};
use middleman_core::config::TierConfig;
use middleman_core::embed::{self, TicketEmbed};
use middleman_core::environment::Clock;
use middleman_core::error::{Result, TicketError};
use middleman_core::ids::ChannelId;
use middleman_core::message::{
    Button, ButtonStyle, Modal, OutgoingMessage, SelectMenu, SelectOption, TextInput,
    TextInputStyle,
};
use middleman_core::model::TicketRecord;
use middleman_core::providers::{
    ChannelInfo, ChatPlatform, Interaction, InteractionResponder, UserProfile,
};
use std::time::Duration;
use tracing::{info, warn};

const THREAD_NAME_LIMIT: usize = 100;
const THREAD_SUFFIX: &str = " Ticket";
const TIER_SEPARATOR: &str = " - ";
const MODAL_TITLE_LIMIT: usize = 45;
const MODAL_TITLE_PREFIX: &str = "MM Request: ";

/// Thread name for a new ticket: `<TIERWORD> - <CREATOR> Ticket`.
///
/// The creator's name keeps only `[A-Za-z0-9_-]` (falling back to `USER`) and
/// is cut so the whole name fits the platform's 100 character limit. An
/// overlong tier word is cut as well, keeping one character of the creator.
#[must_use]
pub fn thread_name(tier_word: &str, creator_username: &str) -> String {
    let mut creator: String = creator_username
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if creator.is_empty() {
        creator = "USER".to_string();
    }
    let fixed = TIER_SEPARATOR.len() + THREAD_SUFFIX.len();
    // Uppercasing can lengthen non-ASCII words, so the budget is taken after.
    let tier: String = tier_word
        .to_uppercase()
        .chars()
        .take(THREAD_NAME_LIMIT - fixed - 1)
        .collect();
    creator.truncate(THREAD_NAME_LIMIT - fixed - tier.chars().count());
    format!("{tier}{TIER_SEPARATOR}{}{THREAD_SUFFIX}", creator.to_uppercase())
}

/// Title of the trade form, cut to the platform's modal title limit.
#[must_use]
pub fn request_form_title(tier_name: &str) -> String {
    let title = format!("{MODAL_TITLE_PREFIX}{tier_name}");
    if title.chars().count() <= MODAL_TITLE_LIMIT {
        return title;
    }
    let keep = MODAL_TITLE_LIMIT.saturating_sub(MODAL_TITLE_PREFIX.len() + 3);
    let cut: String = tier_name.chars().take(keep).collect();
    format!("{MODAL_TITLE_PREFIX}{cut}...")
}

fn request_form(tier: &TierConfig) -> Modal {
    let input = |id: &str, label: &str, style, placeholder: &str| TextInput {
        custom_id: id.to_string(),
        label: label.to_string(),
        style,
        placeholder: placeholder.to_string(),
        required: true,
    };
    Modal {
        custom_id: ComponentId::SubmitRequestForm {
            tier_value: tier.value.clone(),
        }
        .to_string(),
        title: request_form_title(&tier.name),
        inputs: vec![
            input(
                request_form::TRADER,
                "OTHER TRADER (ID/Username):",
                TextInputStyle::Short,
                "Enter ID, @mention, username, or display name",
            ),
            input(
                request_form::YOUR_TRADE,
                "What is YOUR trade? (Be specific)",
                TextInputStyle::Paragraph,
                "e.g., My FR Frost Dragon (Adopt Me)",
            ),
            input(
                request_form::OTHER_TRADE,
                "What is your OTHER TRADER'S trade?",
                TextInputStyle::Paragraph,
                "e.g., Their $50 PayPal F&F",
            ),
        ],
    }
}

struct TradeDetails<'a> {
    tier: &'a TierConfig,
    requester: &'a UserProfile,
    counterparty: &'a UserProfile,
    requester_offer: &'a str,
    counterparty_offer: &'a str,
}

impl<E: Environment> TicketService<E> {
    /// Panel button: offer the tier menu, then warn if a ticket is already open.
    ///
    /// # Errors
    ///
    /// Returns platform failures other than an expired interaction.
    pub async fn request_middleman<R: InteractionResponder>(
        &self,
        interaction: &Interaction,
        responder: &R,
    ) -> Result<()> {
        let menu = SelectMenu {
            custom_id: ComponentId::TierSelect.to_string(),
            placeholder: "Select Trade Value".to_string(),
            options: self
                .config
                .mm_tiers
                .iter()
                .map(|t| SelectOption {
                    label: t.name.clone(),
                    value: t.value.clone(),
                })
                .collect(),
        };
        let prompt = OutgoingMessage::text(format!(
            "{} Select your middleman for your trade value:",
            interaction.user.id.mention()
        ))
        .with_select(menu)
        .ephemeral();
        if !safe_reply(responder, prompt).await? {
            return Ok(());
        }

        let check = self
            .check_open_ticket(
                interaction.user.id,
                self.guild(interaction),
                self.config.detector.default_budget(),
            )
            .await;
        if let Some(ticket) = check.ticket {
            let notice = TicketError::RequesterHasTicket(ticket).to_string();
            safe_edit_reply(responder, OutgoingMessage::text(notice)).await?;
        }
        Ok(())
    }

    /// Tier menu: confirm the tier and offer the trade form button.
    ///
    /// # Errors
    ///
    /// [`TicketError::TierNotFound`] for an unknown tier and
    /// [`TicketError::RequesterHasTicket`] when a ticket is already open.
    pub async fn select_tier<R: InteractionResponder>(
        &self,
        interaction: &Interaction,
        responder: &R,
    ) -> Result<()> {
        let value = interaction.selected_value().unwrap_or_default();
        let tier = self
            .config
            .tier_by_value(value)
            .ok_or_else(|| TicketError::TierNotFound(value.to_string()))?;
        self.ensure_requester_free(interaction, self.config.detector.request_budget())
            .await?;

        let button = Button::new(
            ComponentId::ShowRequestForm {
                tier_value: tier.value.clone(),
            }
            .to_string(),
            "Provide Trade Details",
            ButtonStyle::Primary,
        );
        let message = OutgoingMessage::text(format!(
            "{} You selected: **{}**.",
            interaction.user.id.mention(),
            tier.name
        ))
        .with_button(button);
        safe_update(responder, message).await?;
        Ok(())
    }

    /// Form button: open the trade form for the chosen tier.
    ///
    /// An unknown tier replaces the source message with a retry hint.
    ///
    /// # Errors
    ///
    /// [`TicketError::RequesterHasTicket`] when a ticket is already open.
    pub async fn show_request_form<R: InteractionResponder>(
        &self,
        interaction: &Interaction,
        responder: &R,
        tier_value: &str,
    ) -> Result<()> {
        let Some(tier) = self.config.tier_by_value(tier_value) else {
            warn!(tier_value, "Form requested for an unknown tier");
            safe_update(
                responder,
                OutgoingMessage::text(
                    "Error retrieving middleman selection information. Please try selecting the tier again.",
                ),
            )
            .await?;
            return Ok(());
        };
        self.ensure_requester_free(interaction, self.config.detector.request_budget())
            .await?;
        acknowledge(responder.show_modal(request_form(tier))).await
    }

    /// Form submission: validate both parties and open the ticket thread.
    ///
    /// # Errors
    ///
    /// Every business rejection of ticket creation, plus setup failures. A
    /// thread that was created but could not be set up has been deleted.
    pub async fn create_ticket<R: InteractionResponder>(
        &self,
        interaction: &Interaction,
        responder: &R,
        tier_value: &str,
    ) -> Result<()> {
        acknowledge(responder.defer_reply(true)).await?;
        let requester = &interaction.user;
        let guild = self.guild(interaction);
        let budgets = self.config.detector;

        let mut guard = self.creation_guard();
        if !guard.reserve(requester.id) {
            return Err(TicketError::CreationInProgress(requester.id));
        }
        self.ensure_requester_free(interaction, budgets.submit_budget())
            .await?;

        let tier = self
            .config
            .tier_by_value(tier_value)
            .ok_or_else(|| TicketError::TierNotFound(tier_value.to_string()))?;
        if let Some(reason) = self.ban_reason(requester.id) {
            return Err(TicketError::Banned { reason });
        }

        let input = interaction.field(request_form::TRADER).unwrap_or_default();
        let counterparty = UserResolver::new(self.env.platform(), guild)
            .resolve(input)
            .await
            .ok_or_else(|| TicketError::CounterpartyNotFound(input.to_string()))?
            .user;
        info!(
            user_id = %requester.id,
            counterparty_id = %counterparty.id,
            "Resolved counterparty"
        );
        if counterparty.bot {
            return Err(TicketError::BotCounterparty);
        }
        if counterparty.id == requester.id {
            return Err(TicketError::SelfTrade);
        }

        if !guard.reserve(counterparty.id) {
            return Err(TicketError::CreationInProgress(counterparty.id));
        }
        let check = self
            .check_open_ticket(counterparty.id, guild, budgets.request_budget())
            .await;
        if let Some(ticket) = check.ticket {
            return Err(TicketError::CounterpartyHasTicket {
                user: counterparty.id,
                ticket,
            });
        }
        if let Some(reason) = self.ban_reason(counterparty.id) {
            return Err(TicketError::CounterpartyBanned {
                user: counterparty.id,
                reason,
            });
        }

        let details = TradeDetails {
            tier,
            requester,
            counterparty: &counterparty,
            requester_offer: interaction.field(request_form::YOUR_TRADE).unwrap_or_default(),
            counterparty_offer: interaction.field(request_form::OTHER_TRADE).unwrap_or_default(),
        };
        let (thread, ping_keys) = self.open_thread(interaction.channel_id, &details).await?;

        let record = TicketRecord::opened(
            self.env.clock().now(),
            guild,
            tier.key.clone(),
            ping_keys,
            requester.id,
            counterparty.id,
        );
        let id = thread.id;
        self.registry.update(move |s| s.open_ticket(id, record)).await;
        drop(guard);
        TicketMetrics::record_created();
        info!(
            ticket_id = %thread.id,
            user_id = %requester.id,
            counterparty_id = %counterparty.id,
            tier = %tier.key,
            "Ticket created"
        );

        safe_edit_reply(
            responder,
            OutgoingMessage::text(format!(
                "✅ Ticket created! You can find it here: {}\n\n**Found trader:** {}",
                thread.id.mention(),
                counterparty.tag()
            )),
        )
        .await?;
        Ok(())
    }

    async fn ensure_requester_free(
        &self,
        interaction: &Interaction,
        budget: Duration,
    ) -> Result<()> {
        let check = self
            .check_open_ticket(interaction.user.id, self.guild(interaction), budget)
            .await;
        match check.ticket {
            Some(ticket) => Err(TicketError::RequesterHasTicket(ticket)),
            None => Ok(()),
        }
    }

    /// Create and populate the thread. Any failure after creation deletes it.
    async fn open_thread(
        &self,
        parent: ChannelId,
        details: &TradeDetails<'_>,
    ) -> Result<(ChannelInfo, Vec<String>)> {
        let platform = self.env.platform();
        let name = thread_name(details.tier.thread_word(), &details.requester.username);
        let reason = format!(
            "Middleman ticket by {} for {}",
            details.requester.tag(),
            details.tier.name
        );
        let thread = platform
            .create_private_thread(parent, &name, &reason)
            .await
            .map_err(TicketError::from_creation_failure)?;

        match self.populate_thread(&thread, details).await {
            Ok(ping_keys) => Ok((thread, ping_keys)),
            Err(e) => {
                warn!(ticket_id = %thread.id, error = %e, "Ticket setup failed, deleting thread");
                platform
                    .delete_channel(thread.id, "Error during ticket setup.")
                    .await
                    .best_effort("delete half-created ticket");
                Err(e)
            }
        }
    }

    async fn populate_thread(
        &self,
        thread: &ChannelInfo,
        details: &TradeDetails<'_>,
    ) -> Result<Vec<String>> {
        let platform = self.env.platform();
        for (user, is_requester) in [(details.requester.id, true), (details.counterparty.id, false)] {
            platform
                .add_thread_member(thread.id, user)
                .await
                .map_err(|e| {
                    warn!(ticket_id = %thread.id, user_id = %user, error = %e, "Could not add party");
                    TicketError::party_add_failed(user, is_requester)
                })?;
        }

        let (roles, ping_keys) = self.config.ping_roles(details.tier);
        let mut content = format!(
            "{} has created a ticket with {}.",
            details.requester.id.mention(),
            details.counterparty.id.mention()
        );
        if !roles.is_empty() {
            let mentions: Vec<String> = roles.iter().map(|r| r.mention()).collect();
            content.push_str("\n\n");
            content.push_str(&mentions.join(" "));
        }
        let ticket_embed = embed::encode(&TicketEmbed {
            creator: details.requester.id,
            other_trader: details.counterparty.id,
            creator_offer: details.requester_offer.to_string(),
            other_offer: details.counterparty_offer.to_string(),
            creator_name: details.requester.username.clone(),
            created_at: self.env.clock().now(),
        });
        let claim = Button::new(
            ComponentId::Claim { ticket: thread.id }.to_string(),
            "Claim",
            ButtonStyle::Success,
        )
        .emoji("🔐");
        let message = OutgoingMessage::embed(ticket_embed)
            .with_content(content)
            .with_button(close_button(thread.id))
            .with_button(claim);
        platform
            .send_message(thread.id, message)
            .await
            .map_err(TicketError::from_creation_failure)?;
        Ok(ping_keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_name_strips_and_uppercases() {
        assert_eq!(thread_name("Small", "alice.b!"), "SMALL - ALICEB Ticket");
        assert_eq!(thread_name("Small", "✨✨"), "SMALL - USER Ticket");
    }

    #[test]
    fn thread_name_fits_limit() {
        let name = thread_name("Large", &"x".repeat(300));
        assert_eq!(name.len(), 100);
        assert!(name.ends_with(" Ticket"));
    }

    #[test]
    fn thread_name_clamps_after_uppercasing() {
        // "ß" uppercases to "SS".
        let name = thread_name(&"ß".repeat(60), "alice");
        assert_eq!(name.chars().count(), 100);
        assert!(name.starts_with("SSSS"));
        assert!(name.ends_with(" - A Ticket"));

        assert_eq!(thread_name("straße", "bob"), "STRASSE - BOB Ticket");

        let name = thread_name(&"w".repeat(150), "alice");
        assert_eq!(name.chars().count(), 100);
        assert!(name.ends_with(" - A Ticket"));
    }

    #[test]
    fn long_form_titles_are_cut() {
        assert_eq!(request_form_title("Small"), "MM Request: Small");
        let title = request_form_title(&"Huge trade value tier ".repeat(3));
        assert_eq!(title.chars().count(), 45);
        assert!(title.ends_with("..."));
    }
}
