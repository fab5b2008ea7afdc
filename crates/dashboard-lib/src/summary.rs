//! Summary metrics shown on the dashboard
//!
//! Always recomputed from the current window contents; nothing here is a
//! running total.

use crate::window::{DecisionWindow, TelemetryWindow};
use serde::Serialize;
use std::collections::HashSet;

/// Metrics derived from the telemetry and decision windows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryMetrics {
    /// Sum of `cost_per_min` over the telemetry window
    pub spend: f64,
    /// Rounded average latency in ms, 0 when the window is empty
    pub latency: i64,
    /// Number of distinct services in the telemetry window
    pub services: usize,
    /// Mean decision confidence, `None` when there are no decisions
    pub avg_confidence: Option<f64>,
}

impl SummaryMetrics {
    pub fn compute(telemetry: &TelemetryWindow, decisions: &DecisionWindow) -> Self {
        let spend = telemetry.iter().map(|t| t.cost_per_min).sum();

        let latency = if telemetry.is_empty() {
            0
        } else {
            let total: i64 = telemetry.iter().map(|t| t.latency_ms).sum();
            (total as f64 / telemetry.len() as f64).round() as i64
        };

        let services = telemetry
            .iter()
            .map(|t| t.service.as_str())
            .collect::<HashSet<_>>()
            .len();

        // decisions without a confidence count as zero
        let avg_confidence = if decisions.is_empty() {
            None
        } else {
            let total: f64 = decisions.iter().map(|d| d.confidence.unwrap_or(0.0)).sum();
            Some(total / decisions.len() as f64)
        };

        Self {
            spend,
            latency,
            services,
            avg_confidence,
        }
    }

    /// Projected spend for one hour at the current per-minute rate
    pub fn hourly_spend(&self) -> f64 {
        self.spend * 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Decision, TelemetrySample};
    use crate::window::{DECISION_CAPACITY, TELEMETRY_CAPACITY};

    fn sample(service: &str, latency_ms: i64, cost_per_min: f64) -> TelemetrySample {
        TelemetrySample {
            timestamp: 0,
            service: service.to_string(),
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            cpu: 0.5,
            memory: 128.0,
            latency_ms,
            cost_per_min,
        }
    }

    fn decision(confidence: Option<f64>) -> Decision {
        Decision {
            timestamp: None,
            service: "api".to_string(),
            current_provider: Some("aws".to_string()),
            recommended_provider: "gcp".to_string(),
            region: None,
            reason: "cheaper".to_string(),
            confidence,
            estimated_cost_per_min: None,
        }
    }

    #[test]
    fn test_empty_windows() {
        let metrics = SummaryMetrics::compute(
            &TelemetryWindow::new(TELEMETRY_CAPACITY),
            &DecisionWindow::new(DECISION_CAPACITY),
        );
        assert_eq!(metrics.spend, 0.0);
        assert_eq!(metrics.latency, 0);
        assert_eq!(metrics.services, 0);
        assert_eq!(metrics.avg_confidence, None);
    }

    #[test]
    fn test_spend_latency_and_services() {
        let mut telemetry = TelemetryWindow::new(TELEMETRY_CAPACITY);
        telemetry.push(sample("api", 100, 0.01));
        telemetry.push(sample("api", 201, 0.02));
        telemetry.push(sample("ranker", 50, 0.005));

        let metrics = SummaryMetrics::compute(&telemetry, &DecisionWindow::new(DECISION_CAPACITY));

        let expected_spend: f64 = [0.01, 0.02, 0.005].iter().sum();
        assert_eq!(metrics.spend, expected_spend);
        // (100 + 201 + 50) / 3 = 117
        assert_eq!(metrics.latency, 117);
        assert_eq!(metrics.services, 2);
    }

    #[test]
    fn test_hourly_spend() {
        let mut telemetry = TelemetryWindow::new(TELEMETRY_CAPACITY);
        telemetry.push(sample("api", 10, 0.01));
        let metrics = SummaryMetrics::compute(&telemetry, &DecisionWindow::new(DECISION_CAPACITY));
        assert!((metrics.hourly_spend() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_avg_confidence_counts_missing_as_zero() {
        let mut decisions = DecisionWindow::new(DECISION_CAPACITY);
        decisions.push(decision(Some(0.9)));
        decisions.push(decision(Some(0.5)));
        decisions.push(decision(None));

        let metrics = SummaryMetrics::compute(&TelemetryWindow::new(TELEMETRY_CAPACITY), &decisions);
        let avg = metrics.avg_confidence.unwrap();
        assert!((avg - 1.4 / 3.0).abs() < 1e-12);
    }
}
