//! Best-effort side effects.
//!
//! DMs, log posts, leaderboard refreshes and membership tweaks must never
//! abort the transition they belong to. They still return `Result`; callers
//! consume it through [`BestEffort`], which logs the failure under an
//! operation label and hands back an `Option`.

use std::fmt::Display;
use tracing::warn;

/// Log-and-continue consumption of a fallible side effect.
pub trait BestEffort<T> {
    /// `Some` on success; logs and returns `None` on failure.
    fn best_effort(self, operation: &'static str) -> Option<T>;
}

impl<T, E: Display> BestEffort<T> for Result<T, E> {
    fn best_effort(self, operation: &'static str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(operation, error = %e, "Best-effort operation failed");
                None
            }
        }
    }
}
