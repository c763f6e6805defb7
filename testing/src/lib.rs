//! # Middleman Testing
//!
//! In-memory collaborators for driving the ticket service without a chat
//! platform.
//!
//! This crate provides:
//! - [`platform::MockChatPlatform`] with per-user and per-channel failure injection
//! - [`responder::RecordingResponder`] tracking acknowledgement state
//! - Store, transcript, leaderboard and moderation-log fakes ([`collaborators`])
//! - A wired [`fixtures::Harness`] plus members and interaction builders
//! - proptest strategies for identifiers and names ([`properties`])
//!
//! ## Example
//!
//! ```ignore
//! use middleman_testing::fixtures::{Harness, button, middleman, trader};
//!
//! #[tokio::test]
//! async fn claim_assigns_middleman() {
//!     let harness = Harness::new();
//!     let (alice, bob, mm) = (trader(1, "alice"), trader(2, "bob"), middleman(3, "mm"));
//!     harness.add_members(&[&alice, &bob, &mm]);
//!     harness.seed_ticket(THREAD, &alice, &bob).await;
//!
//!     let (outcome, _) = harness.handle(&button(&mm, THREAD, "claim_ticket_900")).await;
//!     assert_eq!(outcome, Dispatch::Handled);
//! }
//! ```

use chrono::{DateTime, Utc};
use middleman_core::environment::Clock;

pub mod collaborators;
pub mod fixtures;
pub mod platform;
pub mod responder;

/// Deterministic time.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, so ticket records and feedback
    /// timestamps can be compared exactly.
    ///
    /// # Example
    ///
    /// ```
    /// use middleman_testing::mocks::FixedClock;
    /// use middleman_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// proptest strategies for platform identifiers and names.
pub mod properties {
    use proptest::prelude::*;

    /// Snowflake-sized ids (17 to 19 digits).
    pub fn snowflake() -> impl Strategy<Value = u64> {
        10_000_000_000_000_000u64..=9_999_999_999_999_999_999u64
    }

    /// Usernames as the platform allows them.
    pub fn username() -> impl Strategy<Value = String> {
        "[a-z0-9_.]{2,32}"
    }

    /// Arbitrary display text, including characters thread names drop.
    pub fn display_text() -> impl Strategy<Value = String> {
        "[ -~]{0,120}"
    }
}

/// Install a test-writer tracing subscriber. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .try_init();
}

// Re-export commonly used items
pub use fixtures::{Harness, TestEnvironment};
pub use mocks::{FixedClock, test_clock};
pub use platform::MockChatPlatform;
pub use responder::RecordingResponder;
