//! Update aggregation for the dashboard windows
//!
//! The aggregator is the only writer of the telemetry and decision windows.
//! Producers hand it tails by value; it merges them, recomputes the summary
//! metrics and marks a render as pending. The actual draw happens later, on
//! the next frame tick, through [`UpdateAggregator::flush_render`].

use crate::models::{Decision, TelemetrySample};
use crate::observability::ClientMetrics;
use crate::render::{RenderFrame, RenderSurface, TABLE_ROWS};
use crate::summary::SummaryMetrics;
use crate::transport::TransportState;
use crate::window::{
    trim_to_recent, DecisionWindow, TelemetryWindow, DECISION_CAPACITY, TELEMETRY_CAPACITY,
};
use std::time::{Duration, Instant};
use tracing::debug;

/// Cheap identity of a telemetry tail used to skip repeated deliveries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChangeKey {
    count: usize,
    latest_timestamp: i64,
}

impl ChangeKey {
    fn of(tail: &[TelemetrySample]) -> Option<Self> {
        tail.last().map(|latest| Self {
            count: tail.len(),
            latest_timestamp: latest.timestamp,
        })
    }
}

pub struct UpdateAggregator {
    telemetry: TelemetryWindow,
    decisions: DecisionWindow,
    last_telemetry_key: Option<ChangeKey>,
    summary: SummaryMetrics,
    state: TransportState,
    notice: Option<String>,
    render_pending: bool,
    last_render: Option<Duration>,
    metrics: ClientMetrics,
}

impl UpdateAggregator {
    pub fn new(metrics: ClientMetrics) -> Self {
        Self {
            telemetry: TelemetryWindow::new(TELEMETRY_CAPACITY),
            decisions: DecisionWindow::new(DECISION_CAPACITY),
            last_telemetry_key: None,
            summary: SummaryMetrics::default(),
            state: TransportState::Disconnected,
            notice: None,
            render_pending: false,
            last_render: None,
            metrics,
        }
    }

    /// Merge a telemetry tail unless it repeats the previous one.
    ///
    /// Returns true when the tail was accepted (and a render scheduled).
    pub fn apply_telemetry_tail(&mut self, tail: Vec<TelemetrySample>) -> bool {
        let tail = trim_to_recent(tail, TELEMETRY_CAPACITY);
        let Some(key) = ChangeKey::of(&tail) else {
            return false;
        };

        if self.last_telemetry_key == Some(key) {
            debug!(
                count = key.count,
                latest = key.latest_timestamp,
                "Telemetry tail unchanged, skipping"
            );
            self.metrics.inc_tails_skipped();
            return false;
        }

        self.last_telemetry_key = Some(key);
        let appended = self.telemetry.merge(tail);
        debug!(
            appended = appended,
            window = self.telemetry.len(),
            "Merged telemetry tail"
        );
        self.accept_update();
        true
    }

    /// Merge a decision tail. Decisions are infrequent, so every tail renders.
    pub fn apply_decision_tail(&mut self, tail: Vec<Decision>) {
        let tail = trim_to_recent(tail, DECISION_CAPACITY);
        self.decisions.merge(tail);
        self.accept_update();
    }

    /// Returns true if the state changed
    pub fn set_transport_state(&mut self, state: TransportState) -> bool {
        if self.state == state {
            return false;
        }
        self.state = state;
        self.render_pending = true;
        true
    }

    /// Replace the deploy/price result line
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
        self.render_pending = true;
    }

    /// Drop all telemetry, e.g. synthetic samples superseded by live data
    pub fn reset_telemetry(&mut self) {
        self.telemetry.clear();
        self.last_telemetry_key = None;
        self.accept_update();
    }

    /// Return to the freshly constructed state
    pub fn reset(&mut self) {
        self.telemetry.clear();
        self.decisions.clear();
        self.last_telemetry_key = None;
        self.notice = None;
        self.state = TransportState::Disconnected;
        self.last_render = None;
        self.accept_update();
    }

    pub fn render_pending(&self) -> bool {
        self.render_pending
    }

    /// Draw the pending frame, if any. Returns how long the draw took.
    pub fn flush_render(&mut self, surface: &mut dyn RenderSurface) -> Option<Duration> {
        if !self.render_pending {
            return None;
        }
        self.render_pending = false;

        let start = Instant::now();
        self.frame().draw(surface);
        let elapsed = start.elapsed();

        self.metrics.observe_render(elapsed.as_secs_f64());
        self.last_render = Some(elapsed);
        Some(elapsed)
    }

    /// What the next render would show
    pub fn frame(&self) -> RenderFrame {
        RenderFrame {
            state: self.state,
            rows: self.telemetry.recent_first(TABLE_ROWS),
            decisions: self.decisions.recent_first(DECISION_CAPACITY),
            summary: self.summary.clone(),
            notice: self.notice.clone(),
        }
    }

    pub fn telemetry(&self) -> &TelemetryWindow {
        &self.telemetry
    }

    pub fn decisions(&self) -> &DecisionWindow {
        &self.decisions
    }

    pub fn summary(&self) -> &SummaryMetrics {
        &self.summary
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn last_render_duration(&self) -> Option<Duration> {
        self.last_render
    }

    fn accept_update(&mut self) {
        self.summary = SummaryMetrics::compute(&self.telemetry, &self.decisions);
        self.metrics.inc_tails_applied();
        self.metrics
            .set_window_sizes(self.telemetry.len(), self.decisions.len());
        self.render_pending = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::testing::RecordingSurface;

    fn sample(timestamp: i64, service: &str, cost_per_min: f64) -> TelemetrySample {
        TelemetrySample {
            timestamp,
            service: service.to_string(),
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            cpu: 1.0,
            memory: 256.0,
            latency_ms: 100,
            cost_per_min,
        }
    }

    fn samples(range: std::ops::Range<i64>) -> Vec<TelemetrySample> {
        range.map(|ts| sample(ts, "api", 0.001)).collect()
    }

    fn decision(timestamp: i64) -> Decision {
        Decision {
            timestamp: Some(timestamp),
            service: "api".to_string(),
            current_provider: Some("aws".to_string()),
            recommended_provider: "gcp".to_string(),
            region: None,
            reason: "cheaper".to_string(),
            confidence: Some(0.8),
            estimated_cost_per_min: None,
        }
    }

    #[test]
    fn test_window_keeps_last_200_of_concatenation() {
        let mut aggregator = UpdateAggregator::new(ClientMetrics::new());
        aggregator.apply_telemetry_tail(samples(0..120));
        aggregator.apply_telemetry_tail(samples(120..300));

        let timestamps: Vec<i64> = aggregator.telemetry().iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, (100..300).collect::<Vec<i64>>());
    }

    #[test]
    fn test_oversized_tail_is_trimmed() {
        let mut aggregator = UpdateAggregator::new(ClientMetrics::new());
        aggregator.apply_telemetry_tail(samples(0..250));

        assert_eq!(aggregator.telemetry().len(), 200);
        assert_eq!(aggregator.telemetry().iter().next().unwrap().timestamp, 50);
    }

    #[test]
    fn test_identical_tail_renders_once() {
        let mut aggregator = UpdateAggregator::new(ClientMetrics::new());
        let mut surface = RecordingSurface::new();

        assert!(aggregator.apply_telemetry_tail(samples(0..5)));
        aggregator.flush_render(&mut surface);
        assert!(!aggregator.apply_telemetry_tail(samples(0..5)));
        aggregator.flush_render(&mut surface);

        assert_eq!(surface.snapshot().frames, 1);
        assert_eq!(aggregator.telemetry().len(), 5);
    }

    #[test]
    fn test_renders_coalesce_until_flushed() {
        let mut aggregator = UpdateAggregator::new(ClientMetrics::new());
        let mut surface = RecordingSurface::new();

        aggregator.apply_telemetry_tail(samples(0..3));
        aggregator.apply_telemetry_tail(samples(3..6));
        aggregator.apply_decision_tail(vec![decision(1)]);
        assert!(aggregator.render_pending());

        assert!(aggregator.flush_render(&mut surface).is_some());
        assert!(aggregator.flush_render(&mut surface).is_none());

        let recorded = surface.snapshot();
        assert_eq!(recorded.frames, 1);
        assert_eq!(recorded.rows.len(), 6);
        assert_eq!(recorded.rows[0].timestamp, 5, "table is newest first");
    }

    #[test]
    fn test_table_shows_thirty_rows() {
        let mut aggregator = UpdateAggregator::new(ClientMetrics::new());
        let mut surface = RecordingSurface::new();

        aggregator.apply_telemetry_tail(samples(0..80));
        aggregator.flush_render(&mut surface);

        assert_eq!(surface.snapshot().rows.len(), TABLE_ROWS);
    }

    #[test]
    fn test_decision_window_keeps_30_most_recent() {
        let mut aggregator = UpdateAggregator::new(ClientMetrics::new());
        aggregator.apply_decision_tail((0..30).map(decision).collect());
        assert_eq!(aggregator.decisions().len(), 30);

        aggregator.apply_decision_tail((30..35).map(decision).collect());

        let timestamps: Vec<i64> = aggregator
            .decisions()
            .iter()
            .filter_map(|d| d.timestamp)
            .collect();
        assert_eq!(timestamps, (5..35).collect::<Vec<i64>>());
    }

    #[test]
    fn test_decision_tail_always_renders() {
        let mut aggregator = UpdateAggregator::new(ClientMetrics::new());
        let mut surface = RecordingSurface::new();

        aggregator.apply_decision_tail(vec![decision(1)]);
        aggregator.flush_render(&mut surface);
        aggregator.apply_decision_tail(vec![decision(1)]);
        aggregator.flush_render(&mut surface);

        assert_eq!(surface.snapshot().frames, 2);
        assert_eq!(aggregator.decisions().len(), 1);
    }

    #[test]
    fn test_summary_tracks_window() {
        let mut aggregator = UpdateAggregator::new(ClientMetrics::new());
        aggregator.apply_telemetry_tail(vec![sample(1, "api", 0.01)]);

        assert!((aggregator.summary().spend - 0.01).abs() < 1e-12);
        assert!((aggregator.summary().hourly_spend() - 0.6).abs() < 1e-12);
        assert_eq!(aggregator.summary().services, 1);

        aggregator.apply_telemetry_tail(vec![sample(2, "ranker", 0.02)]);
        assert_eq!(aggregator.summary().services, 2);
    }

    #[test]
    fn test_reset_telemetry_clears_change_key() {
        let mut aggregator = UpdateAggregator::new(ClientMetrics::new());
        aggregator.apply_telemetry_tail(samples(0..4));
        aggregator.reset_telemetry();

        assert!(aggregator.telemetry().is_empty());
        assert!(aggregator.apply_telemetry_tail(samples(0..4)));
        assert_eq!(aggregator.telemetry().len(), 4);
    }

    #[test]
    fn test_state_change_schedules_render() {
        let mut aggregator = UpdateAggregator::new(ClientMetrics::new());
        let mut surface = RecordingSurface::new();

        assert!(aggregator.set_transport_state(TransportState::Demo));
        assert!(!aggregator.set_transport_state(TransportState::Demo));
        aggregator.flush_render(&mut surface);

        assert_eq!(surface.snapshot().status_text, "demo mode");
    }

    #[test]
    fn test_empty_tail_is_ignored() {
        let mut aggregator = UpdateAggregator::new(ClientMetrics::new());
        assert!(!aggregator.apply_telemetry_tail(vec![]));
        assert!(!aggregator.render_pending());
    }

    #[test]
    fn test_reset() {
        let mut aggregator = UpdateAggregator::new(ClientMetrics::new());
        aggregator.apply_telemetry_tail(samples(0..4));
        aggregator.apply_decision_tail(vec![decision(1)]);
        aggregator.set_notice("Recommended: aws");
        aggregator.reset();

        assert!(aggregator.telemetry().is_empty());
        assert!(aggregator.decisions().is_empty());
        assert_eq!(aggregator.state(), TransportState::Disconnected);
        assert!(aggregator.frame().notice.is_none());
    }
}
