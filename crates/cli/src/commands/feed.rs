//! Read-only views of the backend's telemetry and decision stores

use anyhow::Result;
use colored::Colorize;
use dashboard_lib::window::{DECISION_CAPACITY, TELEMETRY_CAPACITY};
use dashboard_lib::{
    ApiClient, BackendApi, BackendStatus, Decision, DecisionWindow, SummaryMetrics,
    TelemetrySample, TelemetryWindow,
};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{
    color_confidence, format_cost, format_timestamp, print_json, print_table, print_warning,
    OutputFormat,
};

/// Row for the telemetry table
#[derive(Tabled)]
struct TelemetryRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Mem (MB)")]
    memory: String,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "Cost/min")]
    cost: String,
}

/// Row for the decisions table
#[derive(Tabled)]
struct DecisionRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

/// Newest `limit` samples, newest first, optionally for one service
pub fn select_telemetry(
    samples: Vec<TelemetrySample>,
    service: Option<&str>,
    limit: usize,
) -> Vec<TelemetrySample> {
    samples
        .into_iter()
        .rev()
        .filter(|s| service.map(|name| s.service == name).unwrap_or(true))
        .take(limit)
        .collect()
}

/// Show the most recent telemetry samples
pub async fn show_telemetry(
    client: &ApiClient,
    service: Option<String>,
    limit: usize,
    format: OutputFormat,
) -> Result<()> {
    let samples = client.fetch_telemetry().await?;
    let selected = select_telemetry(samples, service.as_deref(), limit);

    let rows: Vec<TelemetryRow> = selected
        .iter()
        .map(|s| TelemetryRow {
            time: format_timestamp(Some(s.timestamp)),
            service: s.service.clone(),
            provider: s.provider.clone(),
            region: s.region.clone(),
            cpu: format!("{:.2}", s.cpu),
            memory: format!("{:.0}", s.memory),
            latency: format!("{} ms", s.latency_ms),
            cost: format_cost(s.cost_per_min),
        })
        .collect();

    print_table(rows, &selected, format)
}

/// Show the most recent placement decisions
pub async fn show_decisions(client: &ApiClient, limit: usize, format: OutputFormat) -> Result<()> {
    let decisions = client.fetch_decisions().await?;
    let selected: Vec<Decision> = decisions.into_iter().rev().take(limit).collect();

    let rows: Vec<DecisionRow> = selected
        .iter()
        .map(|d| DecisionRow {
            time: format_timestamp(d.timestamp),
            service: d.service.clone(),
            from: d.current_provider.clone().unwrap_or_else(|| "-".to_string()),
            to: d.recommended_provider.green().to_string(),
            region: d.region.clone().unwrap_or_else(|| "-".to_string()),
            reason: d.reason.clone(),
            confidence: color_confidence(d.confidence),
        })
        .collect();

    print_table(rows, &selected, format)
}

/// Backend counters plus the summary the dashboard would show right now
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub backend: Option<BackendStatus>,
    pub telemetry_count: usize,
    pub decisions_count: usize,
    pub summary: SummaryMetrics,
    pub hourly_spend: f64,
}

impl StatusReport {
    /// Summarize over the same windows the dashboard keeps
    pub fn build(
        backend: Option<BackendStatus>,
        telemetry: Vec<TelemetrySample>,
        decisions: Vec<Decision>,
    ) -> Self {
        let telemetry_count = telemetry.len();
        let decisions_count = decisions.len();

        let mut telemetry_window = TelemetryWindow::new(TELEMETRY_CAPACITY);
        telemetry_window.replace(telemetry);
        let mut decision_window = DecisionWindow::new(DECISION_CAPACITY);
        decision_window.replace(decisions);

        let summary = SummaryMetrics::compute(&telemetry_window, &decision_window);
        Self {
            backend,
            telemetry_count,
            decisions_count,
            hourly_spend: summary.hourly_spend(),
            summary,
        }
    }
}

/// Show store sizes and summary metrics
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let (telemetry, decisions, backend) = tokio::join!(
        client.fetch_telemetry(),
        client.fetch_decisions(),
        client.status()
    );
    let report = StatusReport::build(backend.ok(), telemetry?, decisions?);

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("{}", "Dashboard Backend Status".bold());
            println!("{}", "=".repeat(50));
            println!("API URL:                {}", client.base_url().as_str().cyan());
            println!("Telemetry samples:      {}", report.telemetry_count);
            println!("Decisions:              {}", report.decisions_count);
            match &report.backend {
                Some(status) => {
                    println!("Push subscribers:       {}", status.ws_active);
                }
                None => print_warning("/status not available on this backend"),
            }
            println!();

            println!("{}", "Current Window".bold());
            println!("{}", "-".repeat(50));
            println!(
                "Spend:                  {}/min",
                format!("${:.5}", report.summary.spend).green()
            );
            println!(
                "Hourly spend:           {}",
                format!("${:.3}", report.hourly_spend).green()
            );
            println!("Avg latency:            {} ms", report.summary.latency);
            println!("Services:               {}", report.summary.services);
            println!(
                "Avg confidence:         {}",
                color_confidence(report.summary.avg_confidence)
            );
        }
    }

    Ok(())
}
