//! Polling fallback
//!
//! Pulls both the telemetry and the decision store on a fixed interval.
//! Failures are logged at debug level and retried by the next tick; they never
//! stop the loop.

use super::DashboardEvent;
use crate::client::BackendApi;
use crate::models::{Decision, TelemetrySample};
use crate::observability::ClientMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Result of one poll round
#[derive(Debug, Default)]
pub struct PollOutcome {
    pub telemetry: Option<Vec<TelemetrySample>>,
    pub decisions: Option<Vec<Decision>>,
    pub failures: Vec<String>,
}

impl PollOutcome {
    /// True when either pull returned a non-empty result
    pub fn has_data(&self) -> bool {
        self.telemetry.is_some() || self.decisions.is_some()
    }
}

pub struct PollingChannel {
    api: Arc<dyn BackendApi>,
    poll_interval: Duration,
    initial_delay: Duration,
    events: mpsc::Sender<DashboardEvent>,
    task: Option<JoinHandle<()>>,
    metrics: ClientMetrics,
}

impl PollingChannel {
    pub fn new(
        api: Arc<dyn BackendApi>,
        poll_interval: Duration,
        initial_delay: Duration,
        events: mpsc::Sender<DashboardEvent>,
        metrics: ClientMetrics,
    ) -> Self {
        Self {
            api,
            poll_interval,
            initial_delay,
            events,
            task: None,
            metrics,
        }
    }

    /// Start the poll loop; no-op if it is already running
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        let metrics = self.metrics.clone();
        let poll_interval = self.poll_interval;
        let first_tick = Instant::now() + self.initial_delay;

        debug!(
            interval_ms = poll_interval.as_millis() as u64,
            "Starting polling channel"
        );

        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let outcome = poll_once(api.as_ref(), &metrics).await;
                if !forward(&events, outcome).await {
                    break;
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }
}

impl Drop for PollingChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pull both stores concurrently; each pull succeeds or fails on its own
pub async fn poll_once(api: &dyn BackendApi, metrics: &ClientMetrics) -> PollOutcome {
    let (telemetry, decisions) = tokio::join!(api.fetch_telemetry(), api.fetch_decisions());
    let mut outcome = PollOutcome::default();

    match telemetry {
        Ok(tail) if !tail.is_empty() => outcome.telemetry = Some(tail),
        Ok(_) => {}
        Err(e) => {
            debug!(error = %e, "Telemetry poll failed");
            metrics.inc_poll_failures();
            outcome.failures.push(format!("telemetry: {}", e));
        }
    }

    match decisions {
        Ok(tail) if !tail.is_empty() => outcome.decisions = Some(tail),
        Ok(_) => {}
        Err(e) => {
            debug!(error = %e, "Decision poll failed");
            metrics.inc_poll_failures();
            outcome.failures.push(format!("decisions: {}", e));
        }
    }

    outcome
}

/// Returns false once the supervisor is gone
async fn forward(events: &mpsc::Sender<DashboardEvent>, outcome: PollOutcome) -> bool {
    let mut pending = Vec::with_capacity(3);
    if let Some(tail) = outcome.telemetry {
        pending.push(DashboardEvent::PollTelemetry(tail));
    }
    if let Some(tail) = outcome.decisions {
        pending.push(DashboardEvent::PollDecisions(tail));
    }
    for failure in outcome.failures {
        pending.push(DashboardEvent::PollFailed(failure));
    }

    for event in pending {
        if events.send(event).await.is_err() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DashboardError, Result};
    use crate::models::{DeployRequest, PriceRequest, PriceTable};
    use async_trait::async_trait;

    struct StubApi {
        telemetry: Vec<TelemetrySample>,
        decisions_fail: bool,
    }

    #[async_trait]
    impl BackendApi for StubApi {
        async fn fetch_telemetry(&self) -> Result<Vec<TelemetrySample>> {
            Ok(self.telemetry.clone())
        }

        async fn fetch_decisions(&self) -> Result<Vec<Decision>> {
            if self.decisions_fail {
                Err(DashboardError::Status {
                    status: 500,
                    body: "boom".to_string(),
                })
            } else {
                Ok(vec![])
            }
        }

        async fn deploy_request(&self, _request: &DeployRequest) -> Result<Decision> {
            Err(DashboardError::Config("unused".to_string()))
        }

        async fn price(&self, _request: &PriceRequest) -> Result<PriceTable> {
            Ok(PriceTable::new())
        }
    }

    fn sample(timestamp: i64) -> TelemetrySample {
        TelemetrySample {
            timestamp,
            service: "api".to_string(),
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            cpu: 1.0,
            memory: 256.0,
            latency_ms: 80,
            cost_per_min: 0.002,
        }
    }

    #[tokio::test]
    async fn test_poll_once_failure_does_not_hide_other_result() {
        let api = StubApi {
            telemetry: vec![sample(1), sample(2)],
            decisions_fail: true,
        };

        let outcome = poll_once(&api, &ClientMetrics::new()).await;

        assert_eq!(outcome.telemetry.map(|t| t.len()), Some(2));
        assert!(outcome.decisions.is_none());
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].starts_with("decisions"));
    }

    #[tokio::test]
    async fn test_poll_once_empty_results_carry_no_data() {
        let api = StubApi {
            telemetry: vec![],
            decisions_fail: false,
        };

        let outcome = poll_once(&api, &ClientMetrics::new()).await;
        assert!(!outcome.has_data());
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test]
    async fn test_channel_delivers_telemetry_events() {
        let api: Arc<dyn BackendApi> = Arc::new(StubApi {
            telemetry: vec![sample(7)],
            decisions_fail: false,
        });
        let (tx, mut rx) = mpsc::channel(16);
        let mut channel = PollingChannel::new(
            api,
            Duration::from_millis(20),
            Duration::from_millis(1),
            tx,
            ClientMetrics::new(),
        );

        channel.start();
        assert!(channel.is_running());

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            DashboardEvent::PollTelemetry(tail) => assert_eq!(tail[0].timestamp, 7),
            other => panic!("unexpected event: {:?}", other),
        }

        channel.stop();
        assert!(!channel.is_running());
    }
}
