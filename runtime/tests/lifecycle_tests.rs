//! Integration tests for claiming, closing and the terminal actions.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use middleman_core::authority::Permissions;
use middleman_core::component::{ComponentId, feedback_form};
use middleman_core::config::BotConfig;
use middleman_core::error::TicketError;
use middleman_core::ids::{ChannelId, UserId};
use middleman_core::message::{ButtonAction, Component, colors};
use middleman_core::model::{LeaderboardKind, NOT_PROVIDED};
use middleman_core::providers::{Member, TranscriptFormat};
use middleman_core::registry::RegistrySnapshot;
use middleman_runtime::Dispatch;
use middleman_testing::fixtures::{
    Harness, MOD_LOG, TRANSCRIPT_LOG, admin, button, in_dm, middleman, modal_submit, test_config,
    trader,
};
use middleman_testing::platform::BOT_ID;
use middleman_testing::responder::Response;

// ============================================================================
// Test Fixtures
// ============================================================================

const ALICE: u64 = 100_000_000_000_000_001;
const BOB: u64 = 100_000_000_000_000_002;
const MM: u64 = 100_000_000_000_000_003;
const MM2: u64 = 100_000_000_000_000_005;
const ADMIN: u64 = 100_000_000_000_000_006;
const LURKER: u64 = 100_000_000_000_000_007;
const THREAD: ChannelId = ChannelId::new(300_000_000_000_000_001);

struct Cast {
    alice: Member,
    bob: Member,
    mm: Member,
    admin: Member,
}

async fn ticket() -> (Harness, Cast) {
    ticket_with(test_config()).await
}

async fn ticket_with(config: BotConfig) -> (Harness, Cast) {
    let cast = Cast {
        alice: trader(ALICE, "alice"),
        bob: trader(BOB, "bob"),
        mm: middleman(MM, "mm_one"),
        admin: admin(ADMIN, "boss"),
    };
    let harness = Harness::build(config, RegistrySnapshot::default());
    harness.add_members(&[&cast.alice, &cast.bob, &cast.mm, &cast.admin]);
    harness.seed_ticket(THREAD, &cast.alice, &cast.bob).await;
    (harness, cast)
}

fn press(member: &Member, component: &ComponentId) -> middleman_core::providers::Interaction {
    button(member, THREAD, &component.to_string())
}

const CLAIM: ComponentId = ComponentId::Claim { ticket: THREAD };
const CLOSE: ComponentId = ComponentId::Close { ticket: THREAD };

// ============================================================================
// Claim
// ============================================================================

#[tokio::test]
async fn claim_assigns_and_restricts() {
    let (harness, cast) = ticket().await;
    let lurker = trader(LURKER, "lurker");
    harness.add_members(&[&lurker]);
    harness.platform().add_thread(
        THREAD,
        "SMALL - ALICE Ticket",
        &[BOT_ID, ALICE.into(), BOB.into(), LURKER.into()],
        None,
    );

    let (outcome, responder) = harness.handle(&press(&cast.mm, &CLAIM)).await;
    assert_eq!(outcome, Dispatch::Handled);

    let record = harness.service.registry().ticket(THREAD).unwrap();
    assert_eq!(record.middleman_id, Some(UserId::new(MM)));
    assert_eq!(record.claimed_by, Some(UserId::new(MM)));
    assert_eq!(harness.platform().channel_name(THREAD).as_deref(), Some("mm_one"));
    assert_eq!(
        harness.platform().removals(),
        vec![(
            THREAD,
            UserId::new(LURKER),
            "Restrict typing to traders + MM".to_string()
        )]
    );
    let members = harness.platform().members_of(THREAD);
    assert!(members.contains(&UserId::new(MM)));
    assert!(members.contains(&BOT_ID));

    let announced = harness.platform().messages_in(THREAD);
    let title = announced.last().unwrap().message.embeds[0].title.clone();
    assert_eq!(title.as_deref(), Some("**| Middleman Assigned**"));

    let Some(Response::Reply(reply)) = responder.calls().pop() else {
        panic!("expected a reply");
    };
    assert!(reply.ephemeral);
    assert!(reply.content.unwrap().starts_with("✅ You have claimed this ticket!"));
}

#[tokio::test]
async fn second_claim_loses() {
    let (harness, cast) = ticket().await;
    let second = middleman(MM2, "mm_two");
    harness.add_members(&[&second]);

    harness.handle(&press(&cast.mm, &CLAIM)).await;
    let (outcome, responder) = harness.handle(&press(&second, &CLAIM)).await;
    assert_eq!(
        outcome,
        Dispatch::Rejected(TicketError::AlreadyClaimed(UserId::new(MM)))
    );
    assert_eq!(
        responder.last_text().unwrap(),
        format!("🔒 This ticket is already claimed by <@{MM}>.")
    );
    let record = harness.service.registry().ticket(THREAD).unwrap();
    assert_eq!(record.middleman_id, Some(UserId::new(MM)));
}

#[tokio::test]
async fn simultaneous_claims_have_one_winner() {
    let (harness, cast) = ticket().await;
    let second = middleman(MM2, "mm_two");
    harness.add_members(&[&second]);

    let first_press = press(&cast.mm, &CLAIM);
    let second_press = press(&second, &CLAIM);
    let outcomes = futures::future::join_all([
        harness.handle(&first_press),
        harness.handle(&second_press),
    ])
    .await;

    let winners = outcomes
        .iter()
        .filter(|(d, _)| *d == Dispatch::Handled)
        .count();
    assert_eq!(winners, 1);
    let losers: Vec<_> = outcomes
        .iter()
        .filter(|(d, _)| matches!(d, Dispatch::Rejected(TicketError::AlreadyClaimed(_))))
        .collect();
    assert_eq!(losers.len(), 1);

    let winner = harness
        .service
        .registry()
        .ticket(THREAD)
        .unwrap()
        .middleman_id
        .unwrap();
    let Dispatch::Rejected(TicketError::AlreadyClaimed(reported)) = &losers[0].0 else {
        unreachable!();
    };
    assert_eq!(*reported, winner);
}

#[tokio::test]
async fn untracked_thread_cannot_be_claimed() {
    let harness = Harness::new();
    let mm = middleman(MM, "mm_one");
    harness.add_members(&[&mm]);
    harness
        .platform()
        .add_thread(THREAD, "loose thread", &[BOT_ID], None);

    let (outcome, _) = harness.handle(&press(&mm, &CLAIM)).await;
    assert_eq!(outcome, Dispatch::Rejected(TicketError::RecordMissing(THREAD)));
}

#[tokio::test]
async fn controls_only_work_inside_their_thread() {
    let (harness, cast) = ticket().await;
    let elsewhere = button(&cast.mm, ChannelId::new(42), &CLAIM.to_string());
    let (outcome, _) = harness.handle(&elsewhere).await;
    assert_eq!(
        outcome,
        Dispatch::Rejected(TicketError::NotATicket(ChannelId::new(42)))
    );
}

// ============================================================================
// Close
// ============================================================================

#[tokio::test]
async fn close_archives_scores_and_offers_terminal_actions() {
    let (harness, cast) = ticket().await;

    let (outcome, responder) = harness.handle(&press(&cast.mm, &CLOSE)).await;
    assert_eq!(outcome, Dispatch::Handled);
    assert_eq!(responder.calls(), vec![Response::DeferUpdate]);

    // Transcript posted with a viewer link.
    let logged = harness.platform().messages_in(TRANSCRIPT_LOG);
    assert_eq!(logged.len(), 1);
    assert_eq!(
        logged[0].message.embeds[0].title.as_deref(),
        Some("SMALL - ALICE Ticket - Transcript")
    );
    let link = logged[0].message.components.iter().find_map(|c| match c {
        Component::Button(b) => match &b.action {
            ButtonAction::Url(url) => Some(url.clone()),
            ButtonAction::CustomId(_) => None,
        },
        Component::Select(_) => None,
    });
    assert!(link.unwrap().starts_with("https://viewer.test/?url=https://cdn.test/"));

    // Trader points.
    let snapshot = harness.service.registry().snapshot();
    assert_eq!(snapshot.points(LeaderboardKind::Trader, ALICE.into()), 1);
    assert_eq!(snapshot.points(LeaderboardKind::Trader, BOB.into()), 1);
    assert_eq!(harness.env().leaderboards.refreshed(), vec![LeaderboardKind::Trader]);

    // Non-staff removed, record gone, terminal controls posted.
    let removed: Vec<UserId> = harness
        .platform()
        .removals()
        .into_iter()
        .map(|(_, user, reason)| {
            assert_eq!(reason, "Ticket closed");
            user
        })
        .collect();
    assert_eq!(removed, vec![UserId::new(ALICE), UserId::new(BOB)]);
    assert!(harness.service.registry().ticket(THREAD).is_none());
    assert!(harness.platform().channel_exists(THREAD));

    let controls = harness.platform().messages_in(THREAD).pop().unwrap().message;
    assert_eq!(
        controls.button_ids(),
        vec![
            format!("finish_log_ticket_{THREAD}_{MM}"),
            format!("final_reopen_ticket_{THREAD}"),
            format!("final_delete_ticket_{THREAD}"),
        ]
    );
}

#[tokio::test]
async fn traders_cannot_close() {
    let (harness, cast) = ticket().await;
    let (outcome, responder) = harness.handle(&press(&cast.alice, &CLOSE)).await;
    assert_eq!(
        outcome,
        Dispatch::Rejected(TicketError::Unauthorized {
            action: "close this ticket"
        })
    );
    assert_eq!(
        responder.last_text().as_deref(),
        Some("You do not have permission to close this ticket.")
    );
    assert!(harness.service.registry().ticket(THREAD).is_some());
}

#[tokio::test]
async fn oversized_transcript_falls_back_to_notice() {
    let (harness, cast) = ticket().await;
    harness.platform().set_upload_limit(16);

    let (outcome, _) = harness.handle(&press(&cast.mm, &CLOSE)).await;
    assert_eq!(outcome, Dispatch::Handled);

    let logged = harness.platform().messages_in(TRANSCRIPT_LOG);
    assert_eq!(logged.len(), 1);
    assert_eq!(
        logged[0].message.content.as_deref(),
        Some("❌ Transcript could not be attached due to file size or an error.")
    );
    // The rest of the close still ran.
    assert!(harness.service.registry().ticket(THREAD).is_none());
}

#[tokio::test]
async fn failed_render_uses_buffer_fallback() {
    let (harness, cast) = ticket().await;
    harness.env().transcripts.fail_format(TranscriptFormat::Attachment);

    harness.handle(&press(&cast.mm, &CLOSE)).await;

    let logged = harness.platform().messages_in(TRANSCRIPT_LOG);
    assert_eq!(logged.len(), 1);
    assert_eq!(
        logged[0].message.embeds[0].title.as_deref(),
        Some("SMALL - ALICE Ticket - Transcript (fallback)")
    );
    assert_eq!(
        logged[0].message.attachments[0].filename,
        "closed-small___alice_ticket.html"
    );
    let formats: Vec<_> = harness
        .env()
        .transcripts
        .calls()
        .into_iter()
        .map(|(_, options)| options.format)
        .collect();
    assert_eq!(formats, vec![TranscriptFormat::Attachment, TranscriptFormat::Buffer]);
}

#[tokio::test]
async fn leaderboard_failure_keeps_points() {
    let (harness, cast) = ticket().await;
    harness.env().leaderboards.set_failing(true);

    let (outcome, _) = harness.handle(&press(&cast.mm, &CLOSE)).await;
    assert_eq!(outcome, Dispatch::Handled);
    let saved = harness.store.saved().unwrap();
    assert_eq!(saved.points(LeaderboardKind::Trader, ALICE.into()), 1);
}

// ============================================================================
// Finalize, reopen, delete
// ============================================================================

#[tokio::test]
async fn finalize_logs_point_requests_feedback_and_deletes() {
    let (harness, cast) = ticket().await;
    harness.handle(&press(&cast.mm, &CLOSE)).await;

    let finalize = ComponentId::Finalize {
        ticket: THREAD,
        closer: MM.into(),
    };
    let (outcome, responder) = harness.handle(&press(&cast.mm, &finalize)).await;
    assert_eq!(outcome, Dispatch::Handled);
    assert_eq!(responder.calls()[0], Response::DeferReply { ephemeral: true });
    assert_eq!(
        responder.last_text().as_deref(),
        Some("✅ MM point logged, feedback sent. Deleting ticket now...")
    );

    let saved = harness.store.saved().unwrap();
    assert_eq!(saved.points(LeaderboardKind::Middleman, MM.into()), 1);
    assert_eq!(
        harness.env().leaderboards.refreshed(),
        vec![LeaderboardKind::Trader, LeaderboardKind::Middleman]
    );

    let dms = harness.platform().direct_messages();
    let recipients: Vec<UserId> = dms.iter().map(|(u, _)| *u).collect();
    assert_eq!(recipients, vec![UserId::new(ALICE), UserId::new(BOB)]);
    assert_eq!(
        dms[0].1.button_ids(),
        vec![format!("provide_feedback_{THREAD}_{MM}")]
    );

    assert_eq!(
        harness.platform().deleted_channels(),
        vec![(THREAD, "Ticket finished by mm_one.".to_string())]
    );
}

#[tokio::test]
async fn double_finalize_awards_one_point() {
    let mut config = test_config();
    // Keep the first finalize in flight while the second press arrives.
    config.delete_delay_ms = 50;
    let (harness, cast) = ticket_with(config).await;
    harness.handle(&press(&cast.mm, &CLOSE)).await;

    let finalize = press(
        &cast.mm,
        &ComponentId::Finalize {
            ticket: THREAD,
            closer: MM.into(),
        },
    );
    let ((first, _), (second, responder)) =
        tokio::join!(harness.handle(&finalize), harness.handle(&finalize));
    assert_eq!(first, Dispatch::Handled);
    assert_eq!(second, Dispatch::Rejected(TicketError::FinalizeInProgress(THREAD)));
    assert_eq!(
        responder.last_text().as_deref(),
        Some("This ticket is already being finalized.")
    );

    let saved = harness.store.saved().unwrap();
    assert_eq!(saved.points(LeaderboardKind::Middleman, MM.into()), 1);
    assert_eq!(harness.platform().direct_messages().len(), 2);
    assert_eq!(harness.platform().deleted_channels().len(), 1);
}

#[tokio::test]
async fn finalize_after_deletion_is_not_a_ticket() {
    let (harness, cast) = ticket().await;
    harness.handle(&press(&cast.mm, &CLOSE)).await;
    let finalize = ComponentId::Finalize {
        ticket: THREAD,
        closer: MM.into(),
    };
    harness.handle(&press(&cast.mm, &finalize)).await;

    let (again, _) = harness.handle(&press(&cast.mm, &finalize)).await;
    assert_eq!(again, Dispatch::Rejected(TicketError::NotATicket(THREAD)));
    let saved = harness.store.saved().unwrap();
    assert_eq!(saved.points(LeaderboardKind::Middleman, MM.into()), 1);
}

#[tokio::test]
async fn unconfigured_leaderboards_are_not_refreshed() {
    let mut config = test_config();
    config.leaderboard_channel_id = None;
    config.trader_leaderboard_channel_id = None;
    let (harness, cast) = ticket_with(config).await;

    harness.handle(&press(&cast.mm, &CLOSE)).await;
    let finalize = ComponentId::Finalize {
        ticket: THREAD,
        closer: MM.into(),
    };
    let (outcome, _) = harness.handle(&press(&cast.mm, &finalize)).await;
    assert_eq!(outcome, Dispatch::Handled);

    assert!(harness.env().leaderboards.refreshed().is_empty());
    let saved = harness.store.saved().unwrap();
    assert_eq!(saved.points(LeaderboardKind::Trader, ALICE.into()), 1);
    assert_eq!(saved.points(LeaderboardKind::Middleman, MM.into()), 1);
}

#[tokio::test]
async fn finalize_by_non_staff_closer_awards_nothing() {
    let (harness, cast) = ticket().await;
    // An administrator without a staff role closed the ticket.
    harness.handle(&press(&cast.admin, &CLOSE)).await;

    let finalize = ComponentId::Finalize {
        ticket: THREAD,
        closer: ADMIN.into(),
    };
    let (outcome, _) = harness.handle(&press(&cast.mm, &finalize)).await;
    assert_eq!(outcome, Dispatch::Handled);

    let saved = harness.store.saved().unwrap();
    assert_eq!(saved.points(LeaderboardKind::Middleman, ADMIN.into()), 0);
    assert!(!harness
        .env()
        .leaderboards
        .refreshed()
        .contains(&LeaderboardKind::Middleman));
    assert!(!harness.platform().channel_exists(THREAD));
}

#[tokio::test]
async fn blocked_direct_messages_do_not_stop_finalize() {
    let (harness, cast) = ticket().await;
    harness.platform().fail_direct_messages(ALICE.into());
    harness.handle(&press(&cast.mm, &CLOSE)).await;

    let finalize = ComponentId::Finalize {
        ticket: THREAD,
        closer: MM.into(),
    };
    let (outcome, _) = harness.handle(&press(&cast.mm, &finalize)).await;
    assert_eq!(outcome, Dispatch::Handled);
    let recipients: Vec<UserId> = harness
        .platform()
        .direct_messages()
        .iter()
        .map(|(u, _)| *u)
        .collect();
    assert_eq!(recipients, vec![UserId::new(BOB)]);
    assert!(!harness.platform().channel_exists(THREAD));
}

#[tokio::test]
async fn reopen_re_adds_traders_without_restoring_the_record() {
    let (harness, cast) = ticket().await;
    harness.handle(&press(&cast.mm, &CLOSE)).await;
    assert!(!harness.platform().members_of(THREAD).contains(&UserId::new(ALICE)));

    let reopen = ComponentId::Reopen { ticket: THREAD };

    // A middleman role alone is not enough.
    let (outcome, _) = harness.handle(&press(&cast.mm, &reopen)).await;
    assert_eq!(
        outcome,
        Dispatch::Rejected(TicketError::Unauthorized {
            action: "reopen tickets"
        })
    );

    let mut moderator = trader(MM2, "moderator");
    moderator.permissions = Permissions::MANAGE_THREADS;
    harness.add_members(&[&moderator]);
    let (outcome, responder) = harness.handle(&press(&moderator, &reopen)).await;
    assert_eq!(outcome, Dispatch::Handled);
    assert_eq!(
        responder.calls(),
        vec![Response::DeferUpdate, Response::DeleteSource]
    );

    let members = harness.platform().members_of(THREAD);
    assert!(members.contains(&UserId::new(ALICE)));
    assert!(members.contains(&UserId::new(BOB)));
    let notice = harness.platform().messages_in(THREAD).pop().unwrap().message;
    assert_eq!(notice.embeds[0].title.as_deref(), Some("Ticket Reopened"));
    assert_eq!(notice.button_ids(), vec![format!("close_ticket_{THREAD}")]);
    assert!(harness.service.registry().ticket(THREAD).is_none());
}

#[tokio::test]
async fn delete_only_requires_administrator() {
    let (harness, cast) = ticket().await;
    harness.handle(&press(&cast.mm, &CLOSE)).await;
    let delete = ComponentId::DeleteOnly { ticket: THREAD };

    let (outcome, responder) = harness.handle(&press(&cast.mm, &delete)).await;
    assert_eq!(outcome, Dispatch::Rejected(TicketError::AdministratorRequired));
    assert_eq!(
        responder.last_text().as_deref(),
        Some("You must be an Administrator to use the final delete button.")
    );
    assert!(harness.platform().channel_exists(THREAD));

    let (outcome, responder) = harness.handle(&press(&cast.admin, &delete)).await;
    assert_eq!(outcome, Dispatch::Handled);
    assert_eq!(
        responder.last_text().unwrap(),
        "Ticket **SMALL - ALICE Ticket** is being permanently deleted without logging points..."
    );

    let entries = harness.env().mod_log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "Ticket Thread Deleted");
    assert_eq!(entries[0].color, colors::TOMATO);
    assert_eq!(entries[0].note.as_deref(), Some("Deleted by boss."));
    assert_eq!(
        harness.platform().deleted_channels(),
        vec![(THREAD, "Ticket deleted by boss".to_string())]
    );
    let saved = harness.store.saved().unwrap();
    assert!(saved.mm_leaderboard.is_empty());
}

// ============================================================================
// Feedback
// ============================================================================

#[tokio::test]
async fn feedback_round_trip_from_direct_messages() {
    let (harness, cast) = ticket().await;
    let provide = ComponentId::ProvideFeedback {
        ticket: THREAD,
        middleman: Some(MM.into()),
    };
    let (outcome, responder) = harness
        .handle(&in_dm(press(&cast.alice, &provide)))
        .await;
    assert_eq!(outcome, Dispatch::Handled);
    let modal = responder.modals().pop().unwrap();
    assert_eq!(modal.title, "Middleman Feedback");

    let submit = in_dm(modal_submit(
        &cast.alice,
        THREAD,
        &modal.custom_id,
        &[
            (feedback_form::RATING, "5/5"),
            (feedback_form::COMMENTS, "  quick and fair  "),
            (feedback_form::IMPROVEMENT, "   "),
        ],
    ));
    let (outcome, responder) = harness.handle(&submit).await;
    assert_eq!(outcome, Dispatch::Handled);
    assert_eq!(responder.last_text().as_deref(), Some("📝 Feedback Submitted!"));

    let saved = harness.store.saved().unwrap();
    let entries = saved.feedback(THREAD);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].submitter_id, UserId::new(ALICE));
    assert_eq!(entries[0].middleman_id, Some(UserId::new(MM)));
    assert_eq!(entries[0].rating, "5/5");
    assert_eq!(entries[0].comments, "quick and fair");
    assert_eq!(entries[0].improvement_suggestions, NOT_PROVIDED);

    let notice = harness.platform().messages_in(MOD_LOG).pop().unwrap().message;
    let embed = &notice.embeds[0];
    assert_eq!(embed.title.as_deref(), Some("💬 New Ticket Feedback Received"));
    let rated = embed
        .fields
        .iter()
        .find(|f| f.name == "Middleman Rated")
        .unwrap();
    assert_eq!(rated.value, "mm_one");
}

#[tokio::test]
async fn feedback_without_middleman_is_kept() {
    let (harness, cast) = ticket().await;
    let submit = in_dm(modal_submit(
        &cast.bob,
        THREAD,
        &ComponentId::SubmitFeedback {
            ticket: THREAD,
            middleman: None,
        }
        .to_string(),
        &[(feedback_form::RATING, "ok")],
    ));
    let (outcome, _) = harness.handle(&submit).await;
    assert_eq!(outcome, Dispatch::Handled);

    let saved = harness.store.saved().unwrap();
    assert_eq!(saved.feedback(THREAD)[0].middleman_id, None);
    let notice = harness.platform().messages_in(MOD_LOG).pop().unwrap().message;
    let rated = notice.embeds[0]
        .fields
        .iter()
        .find(|f| f.name == "Middleman Rated")
        .unwrap();
    assert_eq!(rated.value, NOT_PROVIDED);
}
