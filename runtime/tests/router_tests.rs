//! Integration tests for interaction routing and error answering.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use middleman_core::component::ComponentId;
use middleman_core::error::{GENERIC_FAILURE, TicketError};
use middleman_core::ids::{ChannelId, UserId};
use middleman_core::model::MmBan;
use middleman_core::registry::RegistrySnapshot;
use middleman_runtime::Dispatch;
use middleman_testing::fixtures::{
    Harness, PANEL, button, in_dm, middleman, select, test_config, trader,
};
use middleman_testing::responder::{RecordingResponder, Response};

const ALICE: u64 = 100_000_000_000_000_001;
const BOB: u64 = 100_000_000_000_000_002;
const MM: u64 = 100_000_000_000_000_003;
const THREAD: ChannelId = ChannelId::new(300_000_000_000_000_001);

fn banned_alice() -> Harness {
    let mut snapshot = RegistrySnapshot::default();
    snapshot.mm_bans.push(MmBan {
        user_id: UserId::new(ALICE),
        reason: "chargeback".into(),
    });
    let harness = Harness::build(test_config(), snapshot);
    harness.add_members(&[&trader(ALICE, "alice"), &trader(BOB, "bob")]);
    harness
}

#[tokio::test]
async fn unknown_components_are_ignored() {
    let harness = Harness::new();
    let alice = trader(ALICE, "alice");
    let (outcome, responder) = harness.handle(&button(&alice, PANEL, "poll_vote_3")).await;
    assert_eq!(outcome, Dispatch::Ignored);
    assert!(responder.calls().is_empty());
}

#[tokio::test]
async fn ticket_controls_are_ignored_in_direct_messages() {
    let harness = Harness::new();
    let mm = middleman(MM, "mm_one");
    let claim = ComponentId::Claim { ticket: THREAD }.to_string();
    let (outcome, responder) = harness.handle(&in_dm(button(&mm, THREAD, &claim))).await;
    assert_eq!(outcome, Dispatch::Ignored);
    assert!(responder.calls().is_empty());
}

#[tokio::test]
async fn banned_users_are_stopped_at_the_panel() {
    let harness = banned_alice();
    let alice = trader(ALICE, "alice");

    let (outcome, responder) = harness
        .handle(&button(&alice, PANEL, &ComponentId::RequestMiddleman.to_string()))
        .await;
    assert_eq!(
        outcome,
        Dispatch::Rejected(TicketError::Banned {
            reason: "chargeback".into()
        })
    );
    let Some(Response::Reply(reply)) = responder.calls().pop() else {
        panic!("expected an ephemeral reply");
    };
    assert!(reply.ephemeral);
    assert_eq!(
        reply.content.as_deref(),
        Some("You are currently banned from requesting a middleman. Reason: chargeback")
    );
}

#[tokio::test]
async fn banned_users_are_stopped_at_every_request_step() {
    let harness = banned_alice();
    let alice = trader(ALICE, "alice");

    let steps = [
        select(&alice, PANEL, &ComponentId::TierSelect.to_string(), "tier_low"),
        button(&alice, PANEL, "show_mm_modal_tier_low"),
        button(&alice, PANEL, "mm_request_modal_tier_low"),
    ];
    for step in &steps {
        let (outcome, _) = harness.handle(step).await;
        assert!(
            matches!(outcome, Dispatch::Rejected(TicketError::Banned { .. })),
            "{} was not gated: {outcome:?}",
            step.custom_id
        );
    }
    assert!(harness.platform().created_threads().is_empty());
}

#[tokio::test]
async fn expired_interactions_are_dropped_silently() {
    let harness = Harness::new();
    let (alice, bob, mm) = (trader(ALICE, "alice"), trader(BOB, "bob"), middleman(MM, "mm_one"));
    harness.add_members(&[&alice, &bob, &mm]);
    harness.seed_ticket(THREAD, &alice, &bob).await;

    let close = button(&mm, THREAD, &ComponentId::Close { ticket: THREAD }.to_string());
    let responder = RecordingResponder::expired();
    let outcome = harness.service.handle(&close, &responder).await;
    assert_eq!(outcome, Dispatch::Expired);
    assert!(responder.calls().is_empty());
    // Nothing happened.
    assert!(harness.service.registry().ticket(THREAD).is_some());
    assert!(harness.platform().removals().is_empty());
}

#[tokio::test]
async fn platform_failures_get_a_generic_notice() {
    let harness = Harness::new();
    let (alice, bob) = (trader(ALICE, "alice"), trader(BOB, "bob"));
    let mut moderator = trader(MM, "moderator");
    moderator.permissions = middleman_core::authority::Permissions::MANAGE_THREADS;
    harness.add_members(&[&alice, &bob, &moderator]);
    harness.seed_ticket(THREAD, &alice, &bob).await;
    harness.platform().fail_sends_to(THREAD);

    let reopen = button(&moderator, THREAD, &ComponentId::Reopen { ticket: THREAD }.to_string());
    let (outcome, responder) = harness.handle(&reopen).await;
    assert!(matches!(outcome, Dispatch::Failed(TicketError::Platform(_))));
    let calls = responder.calls();
    assert_eq!(calls[0], Response::DeferUpdate);
    let Some(Response::FollowUp(notice)) = calls.last() else {
        panic!("expected a follow-up, got {calls:?}");
    };
    assert_eq!(notice.content.as_deref(), Some(GENERIC_FAILURE));
    assert!(notice.ephemeral);
}
