//! # Middleman Core
//!
//! Domain types, wire formats and collaborator traits for the middleman
//! ticket service.
//!
//! A ticket is a private thread in which two traders and one claiming staff
//! member complete a trade. This crate holds everything about a ticket that
//! can be expressed without performing I/O:
//!
//! - **Identifiers**: snowflake newtypes ([`ids`])
//! - **Model**: ticket records, feedback, bans ([`model`])
//! - **Registry**: the persisted document and its pure mutations ([`registry`])
//! - **Wire formats**: the ticket embed ([`embed`]) and component ids ([`component`])
//! - **Collaborators**: platform, storage and rendering traits ([`providers`])
//!
//! The runtime crate wires these together; the testing crate fakes every
//! collaborator.

pub mod authority;
pub mod component;
pub mod config;
pub mod embed;
pub mod error;
pub mod ids;
pub mod message;
pub mod model;
pub mod providers;
pub mod registry;

pub use chrono::{DateTime, Utc};

/// Injected dependencies that are not platform collaborators.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of the current time.
    ///
    /// Ticket records and feedback entries are timestamped through this trait
    /// so tests can pin time with a fixed clock.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
