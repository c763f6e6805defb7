//! Integration tests for service startup.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use middleman_core::environment::Clock;
use middleman_core::ids::{ChannelId, UserId};
use middleman_core::model::TicketRecord;
use middleman_core::registry::RegistrySnapshot;
use middleman_runtime::{start, telemetry};
use middleman_testing::collaborators::InMemoryRegistryStore;
use middleman_testing::fixtures::{GUILD, test_config};
use middleman_testing::{TestEnvironment, test_clock};

const THREAD: ChannelId = ChannelId::new(300_000_000_000_000_001);

#[tokio::test]
async fn start_restores_tracked_tickets() {
    let mut snapshot = RegistrySnapshot::default();
    snapshot.open_ticket(
        THREAD,
        TicketRecord::opened(
            test_clock().now(),
            GUILD,
            "low",
            Vec::new(),
            UserId::new(100_000_000_000_000_001),
            UserId::new(100_000_000_000_000_002),
        ),
    );
    let store = InMemoryRegistryStore::with_snapshot(snapshot);

    let service = start(test_config(), TestEnvironment::default(), store.clone())
        .await
        .unwrap();
    assert!(service.registry().ticket(THREAD).is_some());
    assert_eq!(store.save_count(), 0);
}

#[tokio::test]
async fn unreadable_store_fails_startup() {
    let store = InMemoryRegistryStore::new();
    store.set_failing(true);
    let err = start(test_config(), TestEnvironment::default(), store)
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("storage error"));
}

#[test]
fn tracing_installs_once() {
    telemetry::init_tracing().unwrap();
    assert!(telemetry::init_tracing().is_err());
}
