//! Rendering surface abstraction
//!
//! The aggregator never draws directly. It builds a [`RenderFrame`] and
//! hands it to whatever implements [`RenderSurface`] (a terminal, a web
//! page bridge, a test recorder).

use crate::models::{Decision, TelemetrySample};
use crate::summary::SummaryMetrics;
use crate::transport::TransportState;
use serde::Serialize;

/// Number of telemetry rows shown in the table
pub const TABLE_ROWS: usize = 30;

/// Metric names passed to [`RenderSurface::set_metric_text`]
pub mod metric_names {
    pub const SPEND: &str = "spend";
    pub const LATENCY: &str = "latency";
    pub const SERVICES: &str = "services";
    pub const CONFIDENCE: &str = "confidence";
    pub const HOURLY_SPEND: &str = "hourly_spend";
    pub const SAVINGS: &str = "savings";
}

/// Color class of the status badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    /// Live data (WebSocket or polling)
    Live,
    /// Synthetic demo data
    Demo,
    /// No data source established
    Idle,
}

impl From<TransportState> for StatusClass {
    fn from(state: TransportState) -> Self {
        match state {
            TransportState::LiveWs | TransportState::Polling => StatusClass::Live,
            TransportState::Demo => StatusClass::Demo,
            TransportState::Disconnected | TransportState::ConnectingWs => StatusClass::Idle,
        }
    }
}

/// Operations the dashboard needs from its display
pub trait RenderSurface: Send {
    fn set_status_text(&mut self, text: &str);

    fn set_status_class(&mut self, class: StatusClass);

    /// Replace the telemetry table, rows ordered newest first
    fn replace_table_rows(&mut self, rows: &[TelemetrySample]);

    /// Replace the decision list, newest first
    fn replace_decision_list(&mut self, items: &[Decision]);

    fn set_metric_text(&mut self, name: &str, value: &str);

    /// Result line of the last deploy or price request
    fn set_notice(&mut self, _text: &str) {}

    /// Called once after every operation of a frame has been applied
    fn present(&mut self) {}
}

/// Everything a single render pass shows
#[derive(Debug, Clone)]
pub struct RenderFrame {
    pub state: TransportState,
    pub rows: Vec<TelemetrySample>,
    pub decisions: Vec<Decision>,
    pub summary: SummaryMetrics,
    pub notice: Option<String>,
}

impl RenderFrame {
    /// Push the frame to a surface
    pub fn draw(&self, surface: &mut dyn RenderSurface) {
        surface.set_status_text(self.state.label());
        surface.set_status_class(self.state.into());
        surface.replace_table_rows(&self.rows);
        surface.replace_decision_list(&self.decisions);

        surface.set_metric_text(metric_names::SPEND, &format_spend(self.summary.spend));
        surface.set_metric_text(metric_names::LATENCY, &self.summary.latency.to_string());
        surface.set_metric_text(metric_names::SERVICES, &self.summary.services.to_string());
        surface.set_metric_text(
            metric_names::CONFIDENCE,
            &format_confidence(self.summary.avg_confidence),
        );
        surface.set_metric_text(
            metric_names::HOURLY_SPEND,
            &format!("${:.3}", self.summary.hourly_spend()),
        );
        surface.set_metric_text(metric_names::SAVINGS, "—");

        if let Some(notice) = &self.notice {
            surface.set_notice(notice);
        }
        surface.present();
    }
}

/// Per-minute spend with five decimals
pub fn format_spend(spend: f64) -> String {
    format!("${:.5}", spend)
}

/// Confidence as a whole percentage, a dash when unknown or zero
pub fn format_confidence(confidence: Option<f64>) -> String {
    match confidence {
        Some(c) if c > 0.0 => format!("{:.0}%", c * 100.0),
        _ => "—".to_string(),
    }
}
