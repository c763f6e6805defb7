//! Transcript archival on close.
//!
//! The full history is rendered as an attachment and posted to the transcript
//! log with an info embed; the posted file then gets a viewer link button.
//! When that upload is rejected (usually for size) or yields no hosted file,
//! a raw buffer transcript is posted instead. When even that fails a text
//! notice is posted. Archival never fails the close.

use crate::best_effort::BestEffort;
use middleman_core::embed::TicketParties;
use middleman_core::error::PlatformError;
use middleman_core::ids::ChannelId;
use middleman_core::message::{Attachment, Button, Embed, OutgoingMessage};
use middleman_core::providers::{
    ChannelInfo, ChatPlatform, TranscriptFormat, TranscriptOptions, TranscriptRenderer, UserProfile,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

const FALLBACK_DESCRIPTION: &str = "⚠️ The transcript file was too large to upload with the online viewer. \
Here is the raw HTML transcript attached below.\n\nYou may open it in your browser manually.";
const FAILURE_NOTICE: &str = "❌ Transcript could not be attached due to file size or an error.";

/// How the transcript ended up archived.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Uploaded with a viewer link.
    Linked {
        /// Viewer URL on the link button.
        viewer_url: String,
    },
    /// Uploaded as a raw file after the first attempt failed.
    Fallback,
    /// Only a text notice could be posted.
    NoticeOnly,
    /// No log channel is configured or it could not be resolved.
    Skipped,
}

/// What to archive.
pub struct ArchiveRequest<'a> {
    /// The ticket thread.
    pub ticket: &'a ChannelInfo,
    /// Parties decoded from the ticket embed.
    pub parties: TicketParties,
    /// Who pressed close.
    pub closer: &'a UserProfile,
    /// Configured log channel.
    pub log_channel: Option<ChannelId>,
    /// Viewer link prefix.
    pub viewer_url: &'a str,
    /// Close time.
    pub now: DateTime<Utc>,
}

/// File name used for a ticket's transcript.
#[must_use]
pub fn transcript_filename(thread_name: &str) -> String {
    let slug: String = thread_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("closed-{slug}.html")
}

/// Archive the ticket transcript. Never fails.
pub async fn archive<P, T>(platform: &P, renderer: &T, request: ArchiveRequest<'_>) -> ArchiveOutcome
where
    P: ChatPlatform,
    T: TranscriptRenderer,
{
    let Some(log_channel) = request.log_channel else {
        warn!(ticket_id = %request.ticket.id, "Transcript log channel not configured");
        return ArchiveOutcome::Skipped;
    };
    match platform.channel(log_channel).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            warn!(channel_id = %log_channel, "Transcript log channel not found");
            return ArchiveOutcome::Skipped;
        }
        Err(e) => {
            warn!(channel_id = %log_channel, error = %e, "Transcript log channel could not be resolved");
            return ArchiveOutcome::Skipped;
        }
    }

    let filename = transcript_filename(&request.ticket.name);
    match post_attachment(platform, renderer, &request, log_channel, &filename).await {
        Ok(Some(viewer_url)) => {
            info!(ticket_id = %request.ticket.id, "Transcript archived");
            return ArchiveOutcome::Linked { viewer_url };
        }
        Ok(None) => {
            warn!(ticket_id = %request.ticket.id, "Transcript upload returned no file, using fallback");
        }
        Err(e) if e.is_payload_too_large() => {
            warn!(ticket_id = %request.ticket.id, "Transcript too large, using fallback");
        }
        Err(e) => {
            warn!(ticket_id = %request.ticket.id, error = %e, "Transcript upload failed, using fallback");
        }
    }
    post_fallback(platform, renderer, &request, log_channel, &filename).await
}

async fn post_attachment<P, T>(
    platform: &P,
    renderer: &T,
    request: &ArchiveRequest<'_>,
    log_channel: ChannelId,
    filename: &str,
) -> Result<Option<String>, PlatformError>
where
    P: ChatPlatform,
    T: TranscriptRenderer,
{
    let file = renderer
        .create_transcript(
            request.ticket.id,
            TranscriptOptions::full(TranscriptFormat::Attachment, filename),
        )
        .await?;
    let owner = request.parties.creator.map_or_else(
        || "Unknown".to_string(),
        |id| format!("{} (`{id}`)", id.mention()),
    );
    let info_embed = Embed::titled(format!("{} - Transcript", request.ticket.name))
        .field("Ticket Owner", owner, true)
        .field("Ticket ID", format!("`{}`", request.ticket.id), true)
        .field(
            "Closed By",
            format!("{} ({})", request.closer.tag(), request.closer.id.mention()),
            true,
        )
        .timestamp(request.now)
        .footer("Transcript file attached below.");
    let sent = platform
        .send_message(
            log_channel,
            OutgoingMessage::embed(info_embed).with_attachment(Attachment {
                filename: file.filename,
                data: file.data,
            }),
        )
        .await?;
    let Some(url) = sent.attachment_urls.first() else {
        return Ok(None);
    };
    let viewer_url = format!("{}{url}", request.viewer_url);
    platform
        .edit_message(
            log_channel,
            sent.id,
            OutgoingMessage::default().with_button(Button::link(viewer_url.clone(), filename)),
        )
        .await
        .best_effort("add transcript viewer link");
    Ok(Some(viewer_url))
}

async fn post_fallback<P, T>(
    platform: &P,
    renderer: &T,
    request: &ArchiveRequest<'_>,
    log_channel: ChannelId,
    filename: &str,
) -> ArchiveOutcome
where
    P: ChatPlatform,
    T: TranscriptRenderer,
{
    let attempt = async {
        let file = renderer
            .create_transcript(
                request.ticket.id,
                TranscriptOptions::full(TranscriptFormat::Buffer, filename),
            )
            .await?;
        let embed = Embed::titled(format!("{} - Transcript (fallback)", request.ticket.name))
            .description(FALLBACK_DESCRIPTION)
            .timestamp(request.now);
        platform
            .send_message(
                log_channel,
                OutgoingMessage::embed(embed).with_attachment(Attachment {
                    filename: filename.to_string(),
                    data: file.data,
                }),
            )
            .await
    };
    match attempt.await {
        Ok(_) => ArchiveOutcome::Fallback,
        Err(e) => {
            warn!(ticket_id = %request.ticket.id, error = %e, "Fallback transcript failed");
            platform
                .send_message(log_channel, OutgoingMessage::text(FAILURE_NOTICE))
                .await
                .best_effort("post transcript failure notice");
            ArchiveOutcome::NoticeOnly
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_slugged() {
        assert_eq!(
            transcript_filename("SMALL - ALICE Ticket"),
            "closed-small___alice_ticket.html"
        );
    }
}
