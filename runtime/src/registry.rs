//! The process-wide ticket registry.
//!
//! One [`RegistrySnapshot`] lives behind a synchronous mutex. Every mutation
//! runs as a closure under the lock, which makes it a single atomic decision
//! point relative to other handlers; the lock is released before the
//! whole-state save, so no lock is ever held across an `.await`.
//!
//! Saves are last-writer-wins. Two handlers that mutate concurrently both
//! land in memory, but their saves may reach the store in either order, so
//! the stored copy can briefly lag the in-memory one until the next save.

use crate::metrics::RegistryMetrics;
use middleman_core::error::PlatformError;
use middleman_core::ids::ChannelId;
use middleman_core::providers::RegistryStore;
use middleman_core::registry::RegistrySnapshot;
use middleman_core::model::TicketRecord;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

/// Shared registry handle.
pub struct TicketRegistry<S> {
    state: Mutex<RegistrySnapshot>,
    store: S,
}

impl<S: RegistryStore> TicketRegistry<S> {
    /// Wrap an already-loaded snapshot.
    pub const fn new(store: S, snapshot: RegistrySnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
            store,
        }
    }

    /// Load the stored snapshot at process start.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the snapshot cannot be read.
    pub async fn load(store: S) -> Result<Self, PlatformError> {
        let snapshot = store.load().await?;
        debug!(
            active_tickets = snapshot.active_tickets.len(),
            "Registry loaded"
        );
        Ok(Self::new(store, snapshot))
    }

    fn lock(&self) -> MutexGuard<'_, RegistrySnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read from the current snapshot.
    pub fn read<R>(&self, f: impl FnOnce(&RegistrySnapshot) -> R) -> R {
        f(&self.lock())
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.lock().clone()
    }

    /// Active record for a ticket.
    pub fn ticket(&self, id: ChannelId) -> Option<TicketRecord> {
        self.read(|s| s.ticket(id).cloned())
    }

    /// Mutate under the lock, then persist the whole state.
    ///
    /// Persistence failures are logged and counted, never returned: the
    /// in-memory change stands and the next successful save carries it.
    pub async fn update<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut RegistrySnapshot) -> R + Send,
        R: Send,
    {
        let (result, snapshot) = {
            let mut state = self.lock();
            let result = f(&mut state);
            (result, state.clone())
        };
        self.save(&snapshot).await;
        result
    }

    /// Drop a ticket record, persisting only if it was present.
    pub async fn remove_ticket(&self, id: ChannelId) -> Option<TicketRecord> {
        let (removed, snapshot) = {
            let mut state = self.lock();
            let removed = state.remove_ticket(id);
            let snapshot = removed.is_some().then(|| state.clone());
            (removed, snapshot)
        };
        if let Some(snapshot) = snapshot {
            self.save(&snapshot).await;
        }
        removed
    }

    /// Persist the current state without mutating it.
    pub async fn persist(&self) {
        let snapshot = self.snapshot();
        self.save(&snapshot).await;
    }

    async fn save(&self, snapshot: &RegistrySnapshot) {
        if let Err(e) = self.store.save(snapshot).await {
            RegistryMetrics::record_save_failure();
            error!(error = %e, "Failed to persist registry");
        }
    }
}
