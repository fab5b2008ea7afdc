//! Transport supervisor
//!
//! Single owner of the [`UpdateAggregator`]. Every producer (push channel,
//! polling, demo feed, operator commands) talks to it through
//! [`DashboardEvent`]s, so window merges never interleave.
//!
//! The liveness watchdog runs on its own interval: if no live tail arrived
//! since the previous check the demo feed starts, otherwise it stops (unless
//! forced on).

use super::demo::DemoGenerator;
use super::polling::PollingChannel;
use super::websocket::WebSocketChannel;
use super::{DashboardEvent, TransportConfig, TransportState};
use crate::aggregator::UpdateAggregator;
use crate::client::BackendApi;
use crate::error::{DashboardError, Result};
use crate::health::{components, HealthRegistry};
use crate::models::{Decision, TelemetrySample};
use crate::observability::{ClientMetrics, StructuredLogger};
use crate::render::RenderSurface;
use crate::summary::SummaryMetrics;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Point-in-time view of the dashboard, served on `/snapshot`
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub state: TransportState,
    pub status: &'static str,
    pub telemetry_len: usize,
    pub decisions_len: usize,
    pub summary: SummaryMetrics,
    pub hourly_spend: f64,
    pub demo_active: bool,
    pub demo_forced: bool,
    pub ws_open: bool,
    pub last_render_ms: Option<f64>,
}

/// Cloneable handle for talking to a running supervisor
#[derive(Clone)]
pub struct DashboardHandle {
    tx: mpsc::Sender<DashboardEvent>,
}

impl DashboardHandle {
    pub(crate) fn new(tx: mpsc::Sender<DashboardEvent>) -> Self {
        Self { tx }
    }

    async fn send(&self, event: DashboardEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| DashboardError::ChannelClosed)
    }

    /// Add decisions to the decision window outside of any transport
    pub async fn inject_decisions(&self, decisions: Vec<Decision>) -> Result<()> {
        self.send(DashboardEvent::InjectDecisions(decisions)).await
    }

    pub async fn notice(&self, text: impl Into<String>) -> Result<()> {
        self.send(DashboardEvent::Notice(text.into())).await
    }

    pub async fn set_force_demo(&self, forced: bool) -> Result<()> {
        self.send(DashboardEvent::ForceDemo(forced)).await
    }

    /// Close the push channel without scheduling a reconnect
    pub async fn close_websocket(&self) -> Result<()> {
        self.send(DashboardEvent::CloseWebSocket).await
    }

    pub async fn connect_websocket(&self) -> Result<()> {
        self.send(DashboardEvent::ConnectWebSocket).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(DashboardEvent::Reset).await
    }

    pub async fn snapshot(&self) -> Result<DashboardSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(DashboardEvent::Snapshot(reply)).await?;
        rx.await.map_err(|_| DashboardError::ChannelClosed)
    }
}

/// Builder for [`TransportSupervisor`]
pub struct SupervisorBuilder {
    config: TransportConfig,
    api: Option<Arc<dyn BackendApi>>,
    surface: Option<Box<dyn RenderSurface>>,
    health: Option<HealthRegistry>,
    logger: Option<StructuredLogger>,
    metrics: Option<ClientMetrics>,
}

impl SupervisorBuilder {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            api: None,
            surface: None,
            health: None,
            logger: None,
            metrics: None,
        }
    }

    pub fn api(mut self, api: Arc<dyn BackendApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn surface(mut self, surface: Box<dyn RenderSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn metrics(mut self, metrics: ClientMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<(TransportSupervisor, DashboardHandle)> {
        let api = self
            .api
            .ok_or_else(|| DashboardError::Config("backend API not set".to_string()))?;
        let surface = self
            .surface
            .ok_or_else(|| DashboardError::Config("render surface not set".to_string()))?;
        let metrics = self.metrics.unwrap_or_default();
        let logger = self
            .logger
            .unwrap_or_else(|| StructuredLogger::new("dashboard"));
        let health = self.health.unwrap_or_default();

        let (events_tx, events_rx) = mpsc::channel(self.config.event_buffer_size);

        let websocket = self.config.push_url.as_ref().map(|url| {
            WebSocketChannel::new(
                url.clone(),
                self.config.backoff(),
                events_tx.clone(),
                metrics.clone(),
            )
        });
        let polling = PollingChannel::new(
            api,
            self.config.poll_interval,
            self.config.initial_poll_delay,
            events_tx.clone(),
            metrics.clone(),
        );
        let demo = DemoGenerator::new(self.config.demo_tick, events_tx.clone());

        let supervisor = TransportSupervisor {
            aggregator: UpdateAggregator::new(metrics.clone()),
            surface,
            websocket,
            polling,
            demo,
            events_rx,
            live_since_check: false,
            ws_open: false,
            last_live_source: None,
            synthetic_in_window: false,
            demo_cursor: None,
            ws_connect_failures: 0,
            health,
            logger,
            metrics,
            config: self.config,
        };

        Ok((supervisor, DashboardHandle::new(events_tx)))
    }
}

pub struct TransportSupervisor {
    config: TransportConfig,
    aggregator: UpdateAggregator,
    surface: Box<dyn RenderSurface>,
    websocket: Option<WebSocketChannel>,
    polling: PollingChannel,
    demo: DemoGenerator,
    events_rx: mpsc::Receiver<DashboardEvent>,
    /// A live tail arrived since the last liveness check
    live_since_check: bool,
    ws_open: bool,
    last_live_source: Option<TransportState>,
    /// The telemetry window holds demo samples
    synthetic_in_window: bool,
    /// Timestamp of the newest demo sample merged so far
    demo_cursor: Option<i64>,
    /// Connect attempts that failed since the socket was last open
    ws_connect_failures: u32,
    health: HealthRegistry,
    logger: StructuredLogger,
    metrics: ClientMetrics,
}

impl TransportSupervisor {
    pub fn builder(config: TransportConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(config)
    }

    /// Run until the shutdown signal fires
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        self.health.register_defaults().await;
        self.start_channels().await;

        let liveness_every = self.config.liveness_interval;
        let mut liveness = interval_at(Instant::now() + liveness_every, liveness_every);
        liveness.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut frames = interval(self.config.frame_interval);
        frames.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(event) = self.events_rx.recv() => {
                    self.handle_event(event).await;
                }
                _ = liveness.tick() => {
                    self.check_liveness().await;
                }
                _ = frames.tick(), if self.aggregator.render_pending() => {
                    self.render().await;
                }
                _ = shutdown.recv() => {
                    info!("Supervisor received shutdown signal");
                    break;
                }
            }
        }

        self.stop_channels();
        debug!("Supervisor stopped");
    }

    async fn start_channels(&mut self) {
        match self.websocket.as_mut() {
            Some(websocket) => websocket.connect(),
            None => {
                self.health
                    .set_degraded(components::WEBSOCKET, "no push endpoint configured")
                    .await;
            }
        }
        self.polling.start();

        if self.config.force_demo {
            self.demo.set_forced(true);
            self.start_demo().await;
        }
    }

    fn stop_channels(&mut self) {
        if let Some(websocket) = self.websocket.as_ref() {
            websocket.close_by_app();
        }
        self.polling.stop();
        self.demo.shutdown();
        self.metrics.set_demo_active(false);
    }

    async fn handle_event(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::WsConnecting => {
                if self.aggregator.state() == TransportState::Disconnected {
                    self.set_state(TransportState::ConnectingWs);
                }
            }
            DashboardEvent::WsOpened => {
                self.ws_open = true;
                self.ws_connect_failures = 0;
                self.health.set_healthy(components::WEBSOCKET).await;
                if !self.demo.is_running() {
                    self.set_state(TransportState::LiveWs);
                }
            }
            DashboardEvent::WsClosed { by_app } => {
                let was_open = std::mem::replace(&mut self.ws_open, false);
                self.note_ws_closed(by_app, was_open).await;
                if matches!(
                    self.aggregator.state(),
                    TransportState::LiveWs | TransportState::ConnectingWs
                ) {
                    self.restore_live_state();
                }
            }
            DashboardEvent::WsTelemetry(tail) => {
                self.on_live_telemetry(TransportState::LiveWs, tail).await;
            }
            DashboardEvent::WsDecisions(tail) => {
                self.on_live_decisions(TransportState::LiveWs, tail).await;
            }
            DashboardEvent::PollTelemetry(tail) => {
                self.health.set_healthy(components::POLLING).await;
                self.on_live_telemetry(TransportState::Polling, tail).await;
            }
            DashboardEvent::PollDecisions(tail) => {
                self.health.set_healthy(components::POLLING).await;
                self.on_live_decisions(TransportState::Polling, tail).await;
            }
            DashboardEvent::PollFailed(reason) => {
                self.health.set_degraded(components::POLLING, reason).await;
            }
            DashboardEvent::DemoTail(buffer) => {
                // a tick can race with stop(); drop it
                if self.demo.is_running() {
                    let unseen = self.unseen_demo_samples(buffer);
                    if !unseen.is_empty() {
                        self.aggregator.apply_telemetry_tail(unseen);
                        self.synthetic_in_window = true;
                    }
                }
            }
            DashboardEvent::InjectDecisions(decisions) => {
                self.aggregator.apply_decision_tail(decisions);
            }
            DashboardEvent::Notice(text) => {
                self.aggregator.set_notice(text);
            }
            DashboardEvent::ForceDemo(forced) => {
                self.demo.set_forced(forced);
                if forced {
                    self.start_demo().await;
                } else {
                    self.stop_demo().await;
                }
            }
            DashboardEvent::CloseWebSocket => {
                if let Some(websocket) = self.websocket.as_ref() {
                    websocket.close_by_app();
                }
            }
            DashboardEvent::ConnectWebSocket => {
                if let Some(websocket) = self.websocket.as_mut() {
                    websocket.connect();
                }
            }
            DashboardEvent::Reset => self.reset_view(),
            DashboardEvent::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    async fn note_ws_closed(&mut self, by_app: bool, was_open: bool) {
        if by_app || was_open {
            self.ws_connect_failures = 0;
        } else {
            self.ws_connect_failures += 1;
        }

        if by_app {
            self.health
                .set_degraded(components::WEBSOCKET, "closed by operator")
                .await;
        } else if self.ws_connect_failures >= self.config.ws_unhealthy_after {
            let message = format!(
                "{} consecutive connection failures",
                self.ws_connect_failures
            );
            self.health
                .set_unhealthy(components::WEBSOCKET, message)
                .await;
        } else {
            self.health
                .set_degraded(components::WEBSOCKET, "reconnecting")
                .await;
        }
    }

    async fn on_live_telemetry(&mut self, source: TransportState, tail: Vec<TelemetrySample>) {
        self.note_live_tail(source).await;
        if self.synthetic_in_window && !self.demo.is_running() {
            debug!("Discarding synthetic telemetry in favour of live data");
            self.aggregator.reset_telemetry();
            self.synthetic_in_window = false;
        }
        self.aggregator.apply_telemetry_tail(tail);
    }

    async fn on_live_decisions(&mut self, source: TransportState, tail: Vec<Decision>) {
        self.note_live_tail(source).await;
        self.aggregator.apply_decision_tail(tail);
    }

    async fn note_live_tail(&mut self, source: TransportState) {
        self.live_since_check = true;
        self.last_live_source = Some(source);

        if self.demo.is_running() {
            self.stop_demo().await;
        }
        if self.demo.is_running() {
            return;
        }

        // the push channel outranks polling while the socket is open
        if source == TransportState::LiveWs || !self.ws_open {
            self.set_state(source);
        } else {
            self.set_state(TransportState::LiveWs);
        }
    }

    async fn check_liveness(&mut self) {
        let live = std::mem::take(&mut self.live_since_check);
        debug!(live = live, demo = self.demo.is_running(), "Liveness check");

        if live {
            if self.demo.is_running() {
                self.stop_demo().await;
            }
        } else if !self.demo.is_running() {
            self.start_demo().await;
        }
    }

    async fn start_demo(&mut self) {
        let Some(initial) = self.demo.start() else {
            return;
        };

        self.logger.log_demo(true, self.demo.is_forced());
        self.metrics.set_demo_active(true);
        self.health
            .set_degraded(components::DEMO_FEED, "serving synthetic telemetry")
            .await;

        self.set_state(TransportState::Demo);
        self.demo_cursor = initial.last().map(|s| s.timestamp);
        self.aggregator.apply_telemetry_tail(initial);
        self.synthetic_in_window = true;
    }

    /// The part of a demo buffer not merged yet.
    ///
    /// Each tick carries the generator's whole buffer, and live tails merged in
    /// between break the window's overlap with it.
    fn unseen_demo_samples(&mut self, buffer: Vec<TelemetrySample>) -> Vec<TelemetrySample> {
        let cursor = self.demo_cursor;
        let unseen: Vec<TelemetrySample> = buffer
            .into_iter()
            .filter(|s| cursor.map_or(true, |newest| s.timestamp > newest))
            .collect();
        if let Some(newest) = unseen.last() {
            self.demo_cursor = Some(newest.timestamp);
        }
        unseen
    }

    async fn stop_demo(&mut self) {
        if !self.demo.stop() {
            return;
        }

        self.logger.log_demo(false, false);
        self.metrics.set_demo_active(false);
        self.health.set_healthy(components::DEMO_FEED).await;
        self.restore_live_state();
    }

    /// Empty the view; sources keep running and refill it
    fn reset_view(&mut self) {
        info!(
            telemetry = self.aggregator.telemetry().len(),
            decisions = self.aggregator.decisions().len(),
            "Resetting dashboard view"
        );
        self.aggregator.reset();
        self.synthetic_in_window = false;
        if self.demo.is_running() {
            self.set_state(TransportState::Demo);
        } else {
            self.restore_live_state();
        }
    }

    /// Fall back to whichever live source is still plausible
    fn restore_live_state(&mut self) {
        let state = if self.ws_open {
            TransportState::LiveWs
        } else if self.last_live_source == Some(TransportState::Polling) {
            TransportState::Polling
        } else if self.demo.is_running() {
            TransportState::Demo
        } else {
            TransportState::Disconnected
        };
        self.set_state(state);
    }

    fn set_state(&mut self, state: TransportState) {
        let previous = self.aggregator.state();
        if self.aggregator.set_transport_state(state) {
            self.logger
                .log_transport_change(previous.label(), state.label());
        }
    }

    async fn render(&mut self) {
        if self.aggregator.flush_render(self.surface.as_mut()).is_some() {
            self.health.mark_frame_rendered().await;
        }
    }

    fn snapshot(&self) -> DashboardSnapshot {
        let summary = self.aggregator.summary().clone();
        DashboardSnapshot {
            state: self.aggregator.state(),
            status: self.aggregator.state().label(),
            telemetry_len: self.aggregator.telemetry().len(),
            decisions_len: self.aggregator.decisions().len(),
            hourly_spend: summary.hourly_spend(),
            summary,
            demo_active: self.demo.is_running(),
            demo_forced: self.demo.is_forced(),
            ws_open: self.ws_open,
            last_render_ms: self
                .aggregator
                .last_render_duration()
                .map(|d| d.as_secs_f64() * 1000.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ComponentStatus;
    use crate::models::{DeployRequest, PriceRequest, PriceTable};
    use crate::render::testing::RecordingSurface;
    use async_trait::async_trait;
    use std::time::Duration;

    struct EmptyBackend;

    #[async_trait]
    impl BackendApi for EmptyBackend {
        async fn fetch_telemetry(&self) -> Result<Vec<TelemetrySample>> {
            Ok(vec![])
        }

        async fn fetch_decisions(&self) -> Result<Vec<Decision>> {
            Ok(vec![])
        }

        async fn deploy_request(&self, _request: &DeployRequest) -> Result<Decision> {
            Err(DashboardError::Config("not supported".to_string()))
        }

        async fn price(&self, _request: &PriceRequest) -> Result<PriceTable> {
            Ok(PriceTable::new())
        }
    }

    fn supervisor() -> (TransportSupervisor, RecordingSurface) {
        let surface = RecordingSurface::new();
        let config = TransportConfig {
            demo_tick: Duration::from_secs(3600),
            ..TransportConfig::default()
        };
        let (supervisor, _handle) = SupervisorBuilder::new(config)
            .api(Arc::new(EmptyBackend))
            .surface(Box::new(surface.clone()))
            .build()
            .unwrap();
        (supervisor, surface)
    }

    fn live_sample(timestamp: i64, cost_per_min: f64) -> TelemetrySample {
        TelemetrySample {
            timestamp,
            service: "api".to_string(),
            provider: "aws".to_string(),
            region: "us-east-1".to_string(),
            cpu: 1.0,
            memory: 256.0,
            latency_ms: 120,
            cost_per_min,
        }
    }

    #[test]
    fn test_build_requires_api_and_surface() {
        let err = SupervisorBuilder::new(TransportConfig::default())
            .surface(Box::new(RecordingSurface::new()))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, DashboardError::Config(_)));
    }

    #[tokio::test]
    async fn test_quiet_interval_starts_demo() {
        let (mut supervisor, _surface) = supervisor();

        supervisor.check_liveness().await;

        assert!(supervisor.demo.is_running());
        assert_eq!(supervisor.aggregator.state(), TransportState::Demo);
        assert_eq!(supervisor.aggregator.telemetry().len(), 8);
    }

    #[tokio::test]
    async fn test_live_tail_supersedes_demo() {
        let (mut supervisor, _surface) = supervisor();
        supervisor.check_liveness().await;
        supervisor.handle_event(DashboardEvent::WsOpened).await;
        assert_eq!(supervisor.aggregator.state(), TransportState::Demo);

        supervisor
            .handle_event(DashboardEvent::WsTelemetry(vec![live_sample(1, 0.01)]))
            .await;

        assert!(!supervisor.demo.is_running());
        assert_eq!(supervisor.aggregator.state(), TransportState::LiveWs);
        assert_eq!(supervisor.aggregator.telemetry().len(), 1);
        assert!((supervisor.aggregator.summary().spend - 0.01).abs() < 1e-12);
        assert!((supervisor.aggregator.summary().hourly_spend() - 0.6).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_seen_flag_resets_each_check() {
        let (mut supervisor, _surface) = supervisor();
        supervisor
            .handle_event(DashboardEvent::PollTelemetry(vec![live_sample(1, 0.002)]))
            .await;
        assert_eq!(supervisor.aggregator.state(), TransportState::Polling);

        supervisor.check_liveness().await;
        assert!(!supervisor.demo.is_running());

        supervisor.check_liveness().await;
        assert!(supervisor.demo.is_running());
        // live samples stay, demo batch is merged behind them
        assert_eq!(supervisor.aggregator.telemetry().len(), 9);
    }

    #[tokio::test]
    async fn test_forced_demo_survives_live_data() {
        let (mut supervisor, _surface) = supervisor();
        supervisor.handle_event(DashboardEvent::ForceDemo(true)).await;
        assert!(supervisor.demo.is_running());

        supervisor
            .handle_event(DashboardEvent::WsTelemetry(vec![live_sample(1, 0.01)]))
            .await;
        supervisor.check_liveness().await;

        assert!(supervisor.demo.is_running());
        assert_eq!(supervisor.aggregator.state(), TransportState::Demo);
        assert_eq!(supervisor.aggregator.telemetry().len(), 9);

        supervisor.handle_event(DashboardEvent::ForceDemo(false)).await;
        assert!(!supervisor.demo.is_running());
        assert_eq!(supervisor.aggregator.state(), TransportState::Disconnected);
    }

    #[tokio::test]
    async fn test_forced_demo_tick_after_live_tail_adds_only_new_sample() {
        let (mut supervisor, _surface) = supervisor();
        supervisor.handle_event(DashboardEvent::ForceDemo(true)).await;
        let initial = supervisor.aggregator.telemetry().to_vec();
        assert_eq!(initial.len(), 8);

        supervisor
            .handle_event(DashboardEvent::WsTelemetry(vec![live_sample(1, 0.01)]))
            .await;

        let newest = initial[7].timestamp;
        let mut buffer = initial.clone();
        buffer.push(TelemetrySample {
            service: "ranker".to_string(),
            ..live_sample(newest + 4500, 0.02)
        });
        supervisor
            .handle_event(DashboardEvent::DemoTail(buffer.clone()))
            .await;

        let window = supervisor.aggregator.telemetry();
        assert_eq!(window.len(), 10);
        let expected: f64 = initial.iter().map(|s| s.cost_per_min).sum::<f64>() + 0.01 + 0.02;
        assert!((supervisor.aggregator.summary().spend - expected).abs() < 1e-9);

        // the same buffer again adds nothing
        supervisor.handle_event(DashboardEvent::DemoTail(buffer)).await;
        assert_eq!(supervisor.aggregator.telemetry().len(), 10);
    }

    #[tokio::test]
    async fn test_decision_tail_stops_demo_but_keeps_synthetic_rows_until_live_telemetry() {
        let (mut supervisor, _surface) = supervisor();
        supervisor.check_liveness().await;

        let decision = Decision {
            timestamp: Some(1),
            service: "api".to_string(),
            current_provider: None,
            recommended_provider: "gcp".to_string(),
            region: None,
            reason: "cheaper".to_string(),
            confidence: Some(0.9),
            estimated_cost_per_min: None,
        };
        supervisor
            .handle_event(DashboardEvent::PollDecisions(vec![decision]))
            .await;
        assert!(!supervisor.demo.is_running());
        assert_eq!(supervisor.aggregator.telemetry().len(), 8);

        supervisor
            .handle_event(DashboardEvent::PollTelemetry(vec![live_sample(5, 0.003)]))
            .await;
        assert_eq!(supervisor.aggregator.telemetry().len(), 1);
    }

    #[tokio::test]
    async fn test_demo_tail_after_stop_is_dropped() {
        let (mut supervisor, _surface) = supervisor();
        supervisor
            .handle_event(DashboardEvent::DemoTail(vec![live_sample(1, 0.5)]))
            .await;
        assert!(supervisor.aggregator.telemetry().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_view_but_keeps_sources() {
        let (mut supervisor, _surface) = supervisor();
        supervisor
            .handle_event(DashboardEvent::PollTelemetry(vec![live_sample(1, 0.01)]))
            .await;
        supervisor
            .handle_event(DashboardEvent::Notice("Recommended: aws".to_string()))
            .await;
        supervisor.check_liveness().await;
        supervisor.check_liveness().await;
        assert!(supervisor.demo.is_running());
        let cursor = supervisor.demo_cursor;

        supervisor.handle_event(DashboardEvent::Reset).await;

        assert!(supervisor.aggregator.telemetry().is_empty());
        assert!(supervisor.aggregator.decisions().is_empty());
        assert!(supervisor.aggregator.frame().notice.is_none());
        assert_eq!(supervisor.aggregator.state(), TransportState::Demo);
        assert!(supervisor.demo.is_running());
        assert!(supervisor.aggregator.render_pending());

        // demo ticks only add samples newer than the reset
        let newest = cursor.unwrap();
        supervisor
            .handle_event(DashboardEvent::DemoTail(vec![
                live_sample(newest, 0.5),
                live_sample(newest + 4500, 0.02),
            ]))
            .await;
        assert_eq!(supervisor.aggregator.telemetry().len(), 1);
    }

    #[tokio::test]
    async fn test_ws_state_transitions() {
        let (mut supervisor, _surface) = supervisor();

        supervisor.handle_event(DashboardEvent::WsConnecting).await;
        assert_eq!(supervisor.aggregator.state(), TransportState::ConnectingWs);

        supervisor.handle_event(DashboardEvent::WsOpened).await;
        assert_eq!(supervisor.aggregator.state(), TransportState::LiveWs);

        supervisor
            .handle_event(DashboardEvent::WsClosed { by_app: false })
            .await;
        assert_eq!(supervisor.aggregator.state(), TransportState::Disconnected);
        assert!(!supervisor.ws_open);
    }

    #[tokio::test]
    async fn test_repeated_connect_failures_mark_websocket_unhealthy() {
        let (mut supervisor, _surface) = supervisor();
        let health = supervisor.health.clone();
        supervisor.health.register_defaults().await;

        for _ in 0..4 {
            supervisor.handle_event(DashboardEvent::WsConnecting).await;
            supervisor
                .handle_event(DashboardEvent::WsClosed { by_app: false })
                .await;
        }
        assert_eq!(
            health.health().await.components[components::WEBSOCKET].status,
            ComponentStatus::Degraded
        );

        supervisor
            .handle_event(DashboardEvent::WsClosed { by_app: false })
            .await;
        assert_eq!(
            health.health().await.components[components::WEBSOCKET].status,
            ComponentStatus::Unhealthy
        );
        assert_eq!(health.health().await.status, ComponentStatus::Unhealthy);

        // one successful open clears the streak
        supervisor.handle_event(DashboardEvent::WsOpened).await;
        supervisor
            .handle_event(DashboardEvent::WsClosed { by_app: false })
            .await;
        assert_eq!(
            health.health().await.components[components::WEBSOCKET].status,
            ComponentStatus::Degraded
        );
        assert_eq!(supervisor.ws_connect_failures, 0);
    }

    #[tokio::test]
    async fn test_render_marks_ready() {
        let (mut supervisor, surface) = supervisor();
        let health = supervisor.health.clone();
        assert!(!health.readiness().await.ready);

        supervisor
            .handle_event(DashboardEvent::Notice("Recommended: gcp".to_string()))
            .await;
        supervisor.render().await;
        supervisor.render().await;

        let recorded = surface.snapshot();
        assert_eq!(recorded.frames, 1);
        assert_eq!(recorded.notice.as_deref(), Some("Recommended: gcp"));
        assert!(health.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_snapshot_reply() {
        let (mut supervisor, _surface) = supervisor();
        supervisor
            .handle_event(DashboardEvent::PollTelemetry(vec![live_sample(1, 0.01)]))
            .await;

        let (reply, rx) = oneshot::channel();
        supervisor.handle_event(DashboardEvent::Snapshot(reply)).await;
        let snapshot = rx.await.unwrap();

        assert_eq!(snapshot.state, TransportState::Polling);
        assert_eq!(snapshot.status, "connected (poll)");
        assert_eq!(snapshot.telemetry_len, 1);
        assert!(!snapshot.demo_active);
    }
}
