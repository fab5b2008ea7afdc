//! Observability infrastructure for the dashboard client
//!
//! Provides:
//! - Prometheus metrics (frames, reconnects, poll failures, render latency, window sizes)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for render latency (in seconds)
const RENDER_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ClientMetricsInner> = OnceLock::new();

struct ClientMetricsInner {
    ws_frames_received: IntCounter,
    ws_malformed_frames: IntCounter,
    ws_reconnect_attempts: IntCounter,
    poll_failures: IntCounter,
    tails_applied: IntCounter,
    tails_skipped: IntCounter,
    renders: IntCounter,
    render_latency_seconds: Histogram,
    demo_active: IntGauge,
    telemetry_window_size: IntGauge,
    decision_window_size: IntGauge,
}

impl ClientMetricsInner {
    fn new() -> Self {
        Self {
            ws_frames_received: register_int_counter!(
                "dashboard_ws_frames_received_total",
                "Frames received over the WebSocket push channel"
            )
            .expect("Failed to register ws_frames_received"),

            ws_malformed_frames: register_int_counter!(
                "dashboard_ws_malformed_frames_total",
                "WebSocket frames dropped because they could not be parsed"
            )
            .expect("Failed to register ws_malformed_frames"),

            ws_reconnect_attempts: register_int_counter!(
                "dashboard_ws_reconnect_attempts_total",
                "WebSocket reconnect attempts after an unplanned close"
            )
            .expect("Failed to register ws_reconnect_attempts"),

            poll_failures: register_int_counter!(
                "dashboard_poll_failures_total",
                "Failed pull requests of the polling channel"
            )
            .expect("Failed to register poll_failures"),

            tails_applied: register_int_counter!(
                "dashboard_tails_applied_total",
                "Tails merged into the dashboard windows"
            )
            .expect("Failed to register tails_applied"),

            tails_skipped: register_int_counter!(
                "dashboard_tails_skipped_total",
                "Telemetry tails skipped by change detection"
            )
            .expect("Failed to register tails_skipped"),

            renders: register_int_counter!(
                "dashboard_renders_total",
                "Frames pushed to the render surface"
            )
            .expect("Failed to register renders"),

            render_latency_seconds: register_histogram!(
                "dashboard_render_latency_seconds",
                "Time spent drawing one frame",
                RENDER_BUCKETS.to_vec()
            )
            .expect("Failed to register render_latency_seconds"),

            demo_active: register_int_gauge!(
                "dashboard_demo_active",
                "1 while the demo feed is running"
            )
            .expect("Failed to register demo_active"),

            telemetry_window_size: register_int_gauge!(
                "dashboard_telemetry_window_size",
                "Samples currently held in the telemetry window"
            )
            .expect("Failed to register telemetry_window_size"),

            decision_window_size: register_int_gauge!(
                "dashboard_decision_window_size",
                "Decisions currently held in the decision window"
            )
            .expect("Failed to register decision_window_size"),
        }
    }
}

/// Client metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ClientMetrics {
    _private: (),
}

impl Default for ClientMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ClientMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ClientMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn inc_ws_frames(&self) {
        self.inner().ws_frames_received.inc();
    }

    pub fn inc_malformed_frames(&self) {
        self.inner().ws_malformed_frames.inc();
    }

    pub fn inc_reconnect_attempts(&self) {
        self.inner().ws_reconnect_attempts.inc();
    }

    pub fn inc_poll_failures(&self) {
        self.inner().poll_failures.inc();
    }

    pub fn inc_tails_applied(&self) {
        self.inner().tails_applied.inc();
    }

    pub fn inc_tails_skipped(&self) {
        self.inner().tails_skipped.inc();
    }

    pub fn observe_render(&self, duration_secs: f64) {
        self.inner().renders.inc();
        self.inner().render_latency_seconds.observe(duration_secs);
    }

    pub fn set_demo_active(&self, active: bool) {
        self.inner().demo_active.set(active as i64);
    }

    pub fn set_window_sizes(&self, telemetry: usize, decisions: usize) {
        self.inner().telemetry_window_size.set(telemetry as i64);
        self.inner().decision_window_size.set(decisions as i64);
    }
}

/// Structured logger for dashboard events
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

    pub fn log_startup(&self, version: &str, base_url: &str) {
        info!(
            event = "dashboard_started",
            instance = %self.instance,
            version = %version,
            base_url = %base_url,
            "Dashboard started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "dashboard_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Dashboard shutting down"
        );
    }

    pub fn log_transport_change(&self, from: &str, to: &str) {
        info!(
            event = "transport_changed",
            instance = %self.instance,
            from = %from,
            to = %to,
            "Transport state changed"
        );
    }

    /// Demo feed start/stop
    pub fn log_demo(&self, active: bool, forced: bool) {
        if active {
            warn!(
                event = "demo_started",
                instance = %self.instance,
                forced = forced,
                "No live telemetry, serving synthetic demo data"
            );
        } else {
            info!(
                event = "demo_stopped",
                instance = %self.instance,
                "Live telemetry observed, demo feed stopped"
            );
        }
    }

    pub fn log_deploy_recommendation(
        &self,
        service: &str,
        size: &str,
        recommended_provider: &str,
        estimated_cost_per_min: Option<f64>,
    ) {
        info!(
            event = "deploy_recommendation",
            instance = %self.instance,
            service = %service,
            size = %size,
            recommended_provider = %recommended_provider,
            estimated_cost_per_min = ?estimated_cost_per_min,
            "Received deploy recommendation"
        );
    }
}
