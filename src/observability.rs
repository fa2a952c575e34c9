use std::net::SocketAddr;

use crate::engine::Violation;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: admission attempts. Labels: outcome.
pub const VALIDATIONS_TOTAL: &str = "roomledger_validations_total";

/// Histogram: admission latency in seconds (lock wait + pipeline).
pub const VALIDATION_DURATION_SECONDS: &str = "roomledger_validation_duration_seconds";

/// Counter: committed allocations.
pub const ALLOCATIONS_COMMITTED_TOTAL: &str = "roomledger_allocations_committed_total";

/// Counter: cancelled allocations.
pub const ALLOCATIONS_CANCELLED_TOTAL: &str = "roomledger_allocations_cancelled_total";

/// Counter: room-lock waits that expired (retryable contention).
pub const LOCK_TIMEOUTS_TOTAL: &str = "roomledger_lock_timeouts_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: rooms registered.
pub const ROOMS_ACTIVE: &str = "roomledger_rooms_active";

/// Histogram: event-set size per capacity sweep.
pub const SWEEP_EVENT_COUNT: &str = "roomledger_sweep_event_count";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Map a violation to a short outcome label for metrics.
pub fn violation_label(violation: &Violation) -> &'static str {
    match violation {
        Violation::TermWindow { .. } => "term_window",
        Violation::Blackout { .. } => "blackout",
        Violation::Holiday { .. } => "holiday",
        Violation::Capacity { .. } => "capacity",
    }
}
