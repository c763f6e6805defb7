//! Prometheus metrics for the ticket service.
//!
//! Counters cover every lifecycle transition plus the open-ticket detector and
//! registry persistence. Recording is always safe: without an installed
//! recorder the macros are no-ops.
//!
//! # Example
//!
//! ```rust,no_run
//! use middleman_runtime::metrics::MetricsRecorder;
//!
//! let mut recorder = MetricsRecorder::new();
//! recorder.install()?;
//! println!("{}", recorder.render().unwrap_or_default());
//! # Ok::<(), middleman_runtime::metrics::MetricsError>(())
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, histogram};

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Installs the Prometheus recorder and renders the scrape body.
#[derive(Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// A recorder that has not been installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe all metrics and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed. A recorder
    /// that is already installed (e.g. by another test) is not an error.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();
        match builder()?.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Metrics recorder installed");
                Ok(())
            }
            Err(e) => tolerate_reinstall(&e.to_string()),
        }
    }

    /// Describe all metrics and serve them over HTTP on `addr`.
    ///
    /// Must be called from within a Tokio runtime. [`render`](Self::render)
    /// stays empty; scrape the listener instead.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    pub fn install_with_listener(&mut self, addr: SocketAddr) -> Result<(), MetricsError> {
        register_metrics();
        match builder()?.with_http_listener(addr).install() {
            Ok(()) => {
                tracing::info!(%addr, "Metrics listener installed");
                Ok(())
            }
            Err(e) => tolerate_reinstall(&e.to_string()),
        }
    }

    /// Current metrics in Prometheus text format, once installed.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn builder() -> Result<PrometheusBuilder, MetricsError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 1.5, 2.0, 5.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))
}

fn tolerate_reinstall(err_msg: &str) -> Result<(), MetricsError> {
    if err_msg.contains("already initialized") {
        tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
        Ok(())
    } else {
        Err(MetricsError::Install(err_msg.to_string()))
    }
}

fn register_metrics() {
    describe_counter!("middleman_tickets_created_total", "Ticket threads created");
    describe_counter!("middleman_tickets_claimed_total", "Successful ticket claims");
    describe_counter!(
        "middleman_claim_conflicts_total",
        "Claims rejected because another middleman won"
    );
    describe_counter!("middleman_tickets_closed_total", "Tickets closed");
    describe_counter!("middleman_tickets_finalized_total", "Tickets finalized and deleted");
    describe_counter!("middleman_tickets_deleted_total", "Tickets deleted without logging");
    describe_counter!(
        "middleman_open_ticket_checks_total",
        "Open-ticket checks, labelled by how the answer was reached"
    );
    describe_histogram!(
        "middleman_open_ticket_check_duration_seconds",
        "Time spent deciding whether a user has an open ticket"
    );
    describe_counter!(
        "middleman_stale_records_pruned_total",
        "Registry records dropped because their thread no longer exists"
    );
    describe_counter!(
        "middleman_registry_save_failures_total",
        "Failed registry saves"
    );
}

/// Lifecycle transition metrics.
pub struct TicketMetrics;

impl TicketMetrics {
    /// A ticket thread was created.
    pub fn record_created() {
        counter!("middleman_tickets_created_total").increment(1);
    }

    /// A claim succeeded.
    pub fn record_claimed() {
        counter!("middleman_tickets_claimed_total").increment(1);
    }

    /// A claim lost the race.
    pub fn record_claim_conflict() {
        counter!("middleman_claim_conflicts_total").increment(1);
    }

    /// A ticket was closed.
    pub fn record_closed() {
        counter!("middleman_tickets_closed_total").increment(1);
    }

    /// A ticket was finalized.
    pub fn record_finalized() {
        counter!("middleman_tickets_finalized_total").increment(1);
    }

    /// A ticket was deleted without logging.
    pub fn record_deleted() {
        counter!("middleman_tickets_deleted_total").increment(1);
    }
}

/// Open-ticket detector metrics.
pub struct DetectorMetrics;

impl DetectorMetrics {
    /// Record one check and how it was answered.
    pub fn record_check(outcome: &'static str, duration: Duration) {
        counter!("middleman_open_ticket_checks_total", "outcome" => outcome).increment(1);
        histogram!("middleman_open_ticket_check_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a pruned stale record.
    pub fn record_pruned() {
        counter!("middleman_stale_records_pruned_total").increment(1);
    }
}

/// Registry persistence metrics.
pub struct RegistryMetrics;

impl RegistryMetrics {
    /// Record a failed save.
    pub fn record_save_failure() {
        counter!("middleman_registry_save_failures_total").increment(1);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn recorder_starts_uninstalled() {
        let recorder = MetricsRecorder::new();
        assert!(recorder.render().is_none());
    }

    #[test]
    fn install_is_idempotent() {
        let mut first = MetricsRecorder::new();
        first.install().unwrap();
        let mut second = MetricsRecorder::new();
        assert!(second.install().is_ok());
    }

    #[test]
    fn recording_without_recorder_is_harmless() {
        TicketMetrics::record_created();
        DetectorMetrics::record_check("not_found", Duration::from_millis(3));
        RegistryMetrics::record_save_failure();
    }
}
