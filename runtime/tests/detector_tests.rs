//! Integration tests for the two-phase open-ticket check.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use middleman_core::error::PlatformError;
use middleman_core::ids::ChannelId;
use middleman_core::message::OutgoingMessage;
use middleman_core::model::TicketRecord;
use middleman_core::registry::RegistrySnapshot;
use middleman_runtime::detector::CheckSource;
use middleman_testing::fixtures::{GUILD, Harness, middleman, test_config, trader};
use middleman_testing::platform::BOT_ID;
use middleman_testing::test_clock;
use middleman_core::environment::Clock;
use std::time::Duration;

// ============================================================================
// Test Fixtures
// ============================================================================

const ALICE: u64 = 100_000_000_000_000_001;
const BOB: u64 = 100_000_000_000_000_002;
const MM: u64 = 100_000_000_000_000_003;
const THREAD: ChannelId = ChannelId::new(300_000_000_000_000_001);
const BUDGET: Duration = Duration::from_secs(2);

fn record(creator: u64, other: u64) -> TicketRecord {
    TicketRecord::opened(
        test_clock().now(),
        GUILD,
        "low",
        vec!["mm".into()],
        creator.into(),
        other.into(),
    )
}

async fn seeded() -> Harness {
    let harness = Harness::new();
    let (alice, bob) = (trader(ALICE, "alice"), trader(BOB, "bob"));
    harness.add_members(&[&alice, &bob]);
    harness.seed_ticket(THREAD, &alice, &bob).await;
    harness
}

// ============================================================================
// Phase 1: live threads
// ============================================================================

#[tokio::test]
async fn party_found_by_live_scan() {
    let harness = seeded().await;
    let check = harness
        .service
        .check_open_ticket(BOB.into(), GUILD, BUDGET)
        .await;
    assert_eq!(check.ticket, Some(THREAD));
    assert_eq!(check.source, CheckSource::LiveScan);
}

#[tokio::test]
async fn cold_cache_falls_back_to_live_membership() {
    let harness = seeded().await;
    harness.platform().set_cold_cache();
    let check = harness
        .service
        .check_open_ticket(ALICE.into(), GUILD, BUDGET)
        .await;
    assert_eq!(check.source, CheckSource::LiveScan);
}

#[tokio::test]
async fn observers_are_not_parties() {
    let harness = seeded().await;
    let mm = middleman(MM, "mm");
    harness.add_members(&[&mm]);
    harness
        .platform()
        .add_thread(THREAD, "SMALL - ALICE Ticket", &[BOT_ID, ALICE.into(), BOB.into(), MM.into()], None);
    // Re-registering the thread keeps the seeded embed message.
    let check = harness
        .service
        .check_open_ticket(MM.into(), GUILD, BUDGET)
        .await;
    assert!(!check.has_ticket());
    assert_eq!(check.source, CheckSource::NotFound);
}

#[tokio::test]
async fn unreadable_thread_counts_as_a_ticket() {
    let harness = seeded().await;
    harness.platform().fail_message_fetch(THREAD);
    let check = harness
        .service
        .check_open_ticket(ALICE.into(), GUILD, BUDGET)
        .await;
    assert_eq!(check.ticket, Some(THREAD));
    assert_eq!(check.source, CheckSource::UnverifiedMembership);
}

#[tokio::test]
async fn threads_without_embed_are_skipped() {
    let harness = Harness::new();
    harness
        .platform()
        .add_thread(THREAD, "chatter", &[BOT_ID, ALICE.into()], None);
    harness
        .platform()
        .post_as(THREAD, ALICE.into(), OutgoingMessage::text("hello"));
    let check = harness
        .service
        .check_open_ticket(ALICE.into(), GUILD, BUDGET)
        .await;
    assert_eq!(check.source, CheckSource::NotFound);
}

// ============================================================================
// Phase 2: registry
// ============================================================================

#[tokio::test]
async fn registry_match_needs_live_membership() {
    let mut snapshot = RegistrySnapshot::default();
    snapshot.open_ticket(THREAD, record(ALICE, BOB));
    let harness = Harness::build(test_config(), snapshot);
    // Thread exists and holds Alice, but its embed is gone.
    harness
        .platform()
        .add_thread(THREAD, "SMALL - ALICE Ticket", &[BOT_ID, ALICE.into()], None);

    let alice = harness
        .service
        .check_open_ticket(ALICE.into(), GUILD, BUDGET)
        .await;
    assert_eq!(alice.ticket, Some(THREAD));
    assert_eq!(alice.source, CheckSource::Registry);

    let bob = harness
        .service
        .check_open_ticket(BOB.into(), GUILD, BUDGET)
        .await;
    assert!(!bob.has_ticket());
    assert!(harness.service.registry().ticket(THREAD).is_some());
}

#[tokio::test]
async fn stale_records_are_pruned_once() {
    let mut snapshot = RegistrySnapshot::default();
    snapshot.open_ticket(THREAD, record(ALICE, BOB));
    let harness = Harness::build(test_config(), snapshot);

    let first = harness
        .service
        .check_open_ticket(ALICE.into(), GUILD, BUDGET)
        .await;
    assert!(!first.has_ticket());
    assert!(harness.service.registry().ticket(THREAD).is_none());
    assert_eq!(harness.store.save_count(), 1);

    let second = harness
        .service
        .check_open_ticket(BOB.into(), GUILD, BUDGET)
        .await;
    assert!(!second.has_ticket());
    assert_eq!(harness.store.save_count(), 1);
    assert!(harness.store.saved().unwrap().active_tickets.is_empty());
}

#[tokio::test]
async fn transient_lookup_errors_keep_the_record() {
    let mut snapshot = RegistrySnapshot::default();
    snapshot.open_ticket(THREAD, record(ALICE, BOB));
    let harness = Harness::build(test_config(), snapshot);
    harness
        .platform()
        .set_channel_error(THREAD, PlatformError::Transport("timeout".into()));

    let check = harness
        .service
        .check_open_ticket(ALICE.into(), GUILD, BUDGET)
        .await;
    assert!(!check.has_ticket());
    assert!(harness.service.registry().ticket(THREAD).is_some());
    assert_eq!(harness.store.save_count(), 0);
}

#[tokio::test]
async fn enumeration_failure_skips_the_registry() {
    let mut snapshot = RegistrySnapshot::default();
    snapshot.open_ticket(THREAD, record(ALICE, BOB));
    let harness = Harness::build(test_config(), snapshot);
    harness.platform().fail_thread_enumeration();

    let check = harness
        .service
        .check_open_ticket(ALICE.into(), GUILD, BUDGET)
        .await;
    assert_eq!(check.source, CheckSource::EnumerationFailed);
    assert!(harness.service.registry().ticket(THREAD).is_some());
}

// ============================================================================
// Budget
// ============================================================================

#[tokio::test]
async fn slow_checks_answer_no_ticket() {
    let harness = seeded().await;
    harness.platform().set_latency(Duration::from_millis(200));
    let check = harness
        .service
        .check_open_ticket(ALICE.into(), GUILD, Duration::from_millis(20))
        .await;
    assert!(!check.has_ticket());
    assert_eq!(check.source, CheckSource::TimedOut);
}
