//! Leaderboard points and feedback.

use crate::best_effort::BestEffort;
use crate::registry::TicketRegistry;
use middleman_core::environment::Clock;
use middleman_core::ids::{ChannelId, GuildId, UserId};
use middleman_core::model::{FeedbackEntry, LeaderboardKind, NOT_PROVIDED};
use middleman_core::providers::{LeaderboardSink, RegistryStore, UserProfile};
use tracing::{debug, info};

/// Where a leaderboard is displayed. A board without a channel is never refreshed.
#[derive(Clone, Copy, Debug)]
pub struct Board {
    /// Which leaderboard.
    pub kind: LeaderboardKind,
    /// Guild the board belongs to.
    pub guild: GuildId,
    /// Display channel, if configured.
    pub channel: Option<ChannelId>,
}

/// Award one point to `user`. Returns the new total.
pub async fn award_point<S, L>(
    registry: &TicketRegistry<S>,
    leaderboards: &L,
    board: Board,
    user: UserId,
) -> u64
where
    S: RegistryStore,
    L: LeaderboardSink,
{
    award_points(registry, leaderboards, board, &[user])
        .await
        .first()
        .map_or(0, |(_, points)| *points)
}

/// Award one point to each distinct user, persist, then refresh the display.
///
/// The refresh only runs when the board has a channel and is best-effort:
/// its failure is logged and the increments stand. Returns each user's new
/// total.
pub async fn award_points<S, L>(
    registry: &TicketRegistry<S>,
    leaderboards: &L,
    board: Board,
    users: &[UserId],
) -> Vec<(UserId, u64)>
where
    S: RegistryStore,
    L: LeaderboardSink,
{
    let mut distinct: Vec<UserId> = Vec::with_capacity(users.len());
    for user in users {
        if !distinct.contains(user) {
            distinct.push(*user);
        }
    }
    if distinct.is_empty() {
        return Vec::new();
    }

    let kind = board.kind;
    let totals = registry
        .update(move |s| {
            distinct
                .into_iter()
                .map(|user| (user, s.award_point(kind, user)))
                .collect::<Vec<_>>()
        })
        .await;
    for (user, points) in &totals {
        info!(%kind, user_id = %user, points, "Leaderboard point awarded");
    }

    if board.channel.is_none() {
        debug!(%kind, "No leaderboard channel, skipping refresh");
        return totals;
    }
    let snapshot = registry.snapshot();
    leaderboards
        .refresh(kind, board.guild, &snapshot)
        .await
        .best_effort("refresh leaderboard");
    totals
}

/// A feedback form submission.
#[derive(Clone, Debug)]
pub struct FeedbackSubmission {
    /// Ticket the feedback is about.
    pub ticket: ChannelId,
    /// Rated middleman, if the ticket had one.
    pub middleman: Option<UserId>,
    /// Required short rating.
    pub rating: String,
    /// Optional comments.
    pub comments: Option<String>,
    /// Optional improvement suggestions.
    pub suggestions: Option<String>,
}

/// Append a feedback entry and persist immediately.
///
/// Missing optional fields are stored as `N/A`.
pub async fn record_feedback<S: RegistryStore>(
    registry: &TicketRegistry<S>,
    clock: &impl Clock,
    submitter: &UserProfile,
    submission: FeedbackSubmission,
) -> FeedbackEntry {
    let entry = FeedbackEntry {
        submitter_id: submitter.id,
        submitter_tag: submitter.tag(),
        middleman_id: submission.middleman,
        rating: submission.rating,
        comments: or_placeholder(submission.comments),
        improvement_suggestions: or_placeholder(submission.suggestions),
        timestamp: clock.now(),
    };
    let stored = entry.clone();
    let ticket = submission.ticket;
    registry
        .update(move |s| s.append_feedback(ticket, stored))
        .await;
    info!(ticket_id = %ticket, user_id = %submitter.id, "Feedback recorded");
    entry
}

fn or_placeholder(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| NOT_PROVIDED.to_string())
}
