//! Data acquisition for the dashboard
//!
//! This module provides:
//! - WebSocket push channel with reconnect and exponential backoff
//! - Polling fallback over request/response calls
//! - Local demo feed used when no live data is flowing
//! - Supervisor that arbitrates liveness and owns the aggregator

mod backoff;
mod demo;
mod polling;
mod supervisor;
mod websocket;


pub use backoff::ReconnectBackoff;
pub use demo::{DemoGenerator, DemoSampler};
pub use polling::{PollOutcome, PollingChannel};
pub use supervisor::{DashboardHandle, DashboardSnapshot, SupervisorBuilder, TransportSupervisor};
pub use websocket::{parse_frame, WebSocketChannel};

use crate::models::{Decision, TelemetrySample};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::oneshot;

/// Which source currently feeds the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    Disconnected,
    ConnectingWs,
    LiveWs,
    Polling,
    Demo,
}

impl TransportState {
    /// Status line text
    pub fn label(&self) -> &'static str {
        match self {
            TransportState::Disconnected => "disconnected",
            TransportState::ConnectingWs => "connecting (ws)",
            TransportState::LiveWs => "connected (ws)",
            TransportState::Polling => "connected (poll)",
            TransportState::Demo => "demo mode",
        }
    }
}

/// Messages delivered to the supervisor's event loop
#[derive(Debug)]
pub enum DashboardEvent {
    WsConnecting,
    WsOpened,
    WsClosed { by_app: bool },
    WsTelemetry(Vec<TelemetrySample>),
    WsDecisions(Vec<Decision>),
    PollTelemetry(Vec<TelemetrySample>),
    PollDecisions(Vec<Decision>),
    PollFailed(String),
    DemoTail(Vec<TelemetrySample>),
    /// Decisions from a deploy request; bypass liveness arbitration
    InjectDecisions(Vec<Decision>),
    Notice(String),
    ForceDemo(bool),
    CloseWebSocket,
    ConnectWebSocket,
    /// Clear both windows and the notice line
    Reset,
    Snapshot(oneshot::Sender<DashboardSnapshot>),
}

/// Timing and endpoint configuration for the transports
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// WebSocket endpoint; `None` runs on polling and demo only
    pub push_url: Option<String>,
    pub poll_interval: Duration,
    /// Delay before the first poll
    pub initial_poll_delay: Duration,
    pub liveness_interval: Duration,
    pub demo_tick: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_factor: f64,
    /// Consecutive failed connects before the push channel reports unhealthy
    pub ws_unhealthy_after: u32,
    /// Deferred render cadence
    pub frame_interval: Duration,
    pub event_buffer_size: usize,
    /// Keep demo data running even when live data arrives
    pub force_demo: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            push_url: None,
            poll_interval: Duration::from_millis(4000),
            initial_poll_delay: Duration::from_millis(1200),
            liveness_interval: Duration::from_millis(5000),
            demo_tick: Duration::from_millis(4500),
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(30_000),
            backoff_factor: 1.8,
            ws_unhealthy_after: 5,
            frame_interval: Duration::from_millis(16),
            event_buffer_size: 256,
            force_demo: false,
        }
    }
}

impl TransportConfig {
    pub fn backoff(&self) -> ReconnectBackoff {
        ReconnectBackoff::new(self.initial_backoff, self.max_backoff, self.backoff_factor)
    }
}
