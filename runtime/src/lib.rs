//! # Middleman Runtime
//!
//! Runs middleman tickets on top of the collaborator traits from
//! `middleman-core`.
//!
//! ## Core Components
//!
//! - **Registry**: the shared ticket registry with whole-state persistence ([`registry`])
//! - **Detector**: the two-phase open-ticket check ([`detector`])
//! - **Resolver**: counterparty lookup from free-form input ([`resolver`])
//! - **Service**: every lifecycle transition ([`service`])
//! - **Router**: component-id dispatch and error answering ([`router`])
//!
//! ## Example
//!
//! ```ignore
//! use middleman_runtime::{JsonFileStore, start, router::Dispatch};
//!
//! let store = JsonFileStore::new(config.data_path.clone());
//! let service = start(config, environment, store).await?;
//!
//! // For each component interaction delivered by the platform adapter:
//! let outcome = service.handle(&interaction, &responder).await;
//! assert!(matches!(outcome, Dispatch::Handled));
//! ```

use middleman_core::config::BotConfig;
use std::sync::Arc;
use tracing::info;

pub mod best_effort;
pub mod detector;
pub mod environment;
pub mod json_store;
pub mod metrics;
pub mod registry;
pub mod resolver;
pub mod respond;
pub mod router;
pub mod scoring;
pub mod service;
pub mod telemetry;
pub mod transcript;

pub use environment::Environment;
pub use json_store::JsonFileStore;
pub use registry::TicketRegistry;
pub use router::Dispatch;
pub use service::TicketService;

/// Load the registry from `store`, install metrics and assemble the service.
///
/// Production passes a [`JsonFileStore`] over `config.data_path`:
///
/// ```ignore
/// let store = JsonFileStore::new(config.data_path.clone());
/// let service = middleman_runtime::start(config, environment, store).await?;
/// ```
///
/// # Errors
///
/// Fails if the stored registry cannot be read, or if the metrics exporter
/// cannot be installed.
pub async fn start<E: Environment>(config: BotConfig, env: E, store: E::Store) -> anyhow::Result<TicketService<E>> {
    let mut recorder = metrics::MetricsRecorder::new();
    match config.metrics_addr.as_deref() {
        Some(addr) => recorder.install_with_listener(addr.parse()?)?,
        None => recorder.install()?,
    }

    let registry = TicketRegistry::load(store).await?;
    let tracked = registry.read(|s| s.active_tickets.len());
    info!(
        guild_id = %config.guild_id,
        tiers = config.mm_tiers.len(),
        tracked,
        "Middleman service started"
    );
    Ok(TicketService::new(Arc::new(config), env, registry))
}
