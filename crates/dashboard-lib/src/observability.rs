//! Observability infrastructure for the agent dashboard
//!
//! Provides:
//! - Prometheus metrics (cycle latency, snapshot sources, inventory failures, subscribers)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for cycle latency (in seconds); kubectl round trips dominate
const CYCLE_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<DashboardMetricsInner> = OnceLock::new();

struct DashboardMetricsInner {
    cycle_latency_seconds: Histogram,
    cycles_total: IntCounterVec,
    inventory_failures: IntCounter,
    fallback_failures: IntCounter,
    active_subscribers: IntGauge,
    agents_in_snapshot: IntGauge,
}

impl DashboardMetricsInner {
    fn new() -> Self {
        Self {
            cycle_latency_seconds: register_histogram!(
                "agent_dashboard_cycle_latency_seconds",
                "Time spent producing one snapshot",
                CYCLE_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_latency_seconds"),

            cycles_total: register_int_counter_vec!(
                "agent_dashboard_cycles_total",
                "Snapshots produced, by where they came from",
                &["source"]
            )
            .expect("Failed to register cycles_total"),

            inventory_failures: register_int_counter!(
                "agent_dashboard_inventory_failures_total",
                "Inventory reads that failed and triggered the fallback"
            )
            .expect("Failed to register inventory_failures"),

            fallback_failures: register_int_counter!(
                "agent_dashboard_fallback_failures_total",
                "Fallback loads that failed and produced an empty snapshot"
            )
            .expect("Failed to register fallback_failures"),

            active_subscribers: register_int_gauge!(
                "agent_dashboard_active_subscribers",
                "Live stream subscribers currently connected"
            )
            .expect("Failed to register active_subscribers"),

            agents_in_snapshot: register_int_gauge!(
                "agent_dashboard_agents",
                "Number of agents in the most recent snapshot"
            )
            .expect("Failed to register agents_in_snapshot"),
        }
    }
}

/// Dashboard metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share
/// the same underlying metrics.
#[derive(Clone)]
pub struct DashboardMetrics {
    _private: (),
}

impl Default for DashboardMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(DashboardMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &DashboardMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record one finished cycle
    pub fn observe_cycle(&self, source: &str, duration_secs: f64, agents: usize) {
        let inner = self.inner();
        inner.cycle_latency_seconds.observe(duration_secs);
        inner.cycles_total.with_label_values(&[source]).inc();
        inner.agents_in_snapshot.set(agents as i64);
    }

    pub fn inc_inventory_failures(&self) {
        self.inner().inventory_failures.inc();
    }

    pub fn inc_fallback_failures(&self) {
        self.inner().fallback_failures.inc();
    }

    pub fn subscriber_opened(&self) {
        self.inner().active_subscribers.inc();
    }

    pub fn subscriber_closed(&self) {
        self.inner().active_subscribers.dec();
    }

    pub fn active_subscribers(&self) -> i64 {
        self.inner().active_subscribers.get()
    }
}

/// Structured logger for dashboard events
///
/// Keeps event names and field sets consistent across the server.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, backend: &str, port: u16) {
        info!(
            event = "dashboard_started",
            instance = %self.instance,
            version = %version,
            inventory_backend = %backend,
            port = port,
            "Agent dashboard started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "dashboard_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Agent dashboard shutting down"
        );
    }

    /// Log a completed snapshot cycle
    pub fn log_cycle(&self, source: &str, agents: usize, elapsed_ms: u128) {
        info!(
            event = "snapshot_cycle",
            instance = %self.instance,
            source = %source,
            agents = agents,
            elapsed_ms = elapsed_ms,
            "Snapshot produced"
        );
    }

    pub fn log_inventory_failure(&self, provider: &str, error: &str) {
        warn!(
            event = "inventory_unavailable",
            instance = %self.instance,
            provider = %provider,
            error = %error,
            "Inventory read failed, using fallback snapshot"
        );
    }

    pub fn log_fallback_failure(&self, error: &str) {
        warn!(
            event = "fallback_unavailable",
            instance = %self.instance,
            error = %error,
            "Fallback snapshot unavailable, serving empty snapshot"
        );
    }

    pub fn log_subscriber_opened(&self, subscriber_id: u64) {
        info!(
            event = "subscriber_opened",
            instance = %self.instance,
            subscriber_id = subscriber_id,
            "Live stream subscriber connected"
        );
    }

    pub fn log_subscriber_closed(&self, subscriber_id: u64, delivered: u64) {
        info!(
            event = "subscriber_closed",
            instance = %self.instance,
            subscriber_id = subscriber_id,
            delivered = delivered,
            "Live stream subscriber closed"
        );
    }
}
