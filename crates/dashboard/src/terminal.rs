//! Terminal render surface

use chrono::{TimeZone, Utc};
use colored::Colorize;
use dashboard_lib::render::{format_confidence, metric_names};
use dashboard_lib::{Decision, RenderSurface, StatusClass, TelemetrySample};
use std::io::Write;
use tabled::{settings::Style, Table, Tabled};

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

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
    #[tabled(rename = "$/min")]
    cost: String,
}

impl From<&TelemetrySample> for TelemetryRow {
    fn from(sample: &TelemetrySample) -> Self {
        Self {
            time: format_time(Some(sample.timestamp)),
            service: sample.service.clone(),
            provider: sample.provider.clone(),
            region: sample.region.clone(),
            cpu: format!("{:.2}", sample.cpu),
            memory: format!("{:.0}", sample.memory),
            latency: format!("{} ms", sample.latency_ms),
            cost: format!("{:.6}", sample.cost_per_min),
        }
    }
}

fn format_time(timestamp: Option<i64>) -> String {
    timestamp
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "—".to_string())
}

fn format_decision(decision: &Decision) -> String {
    let from = decision.current_provider.as_deref().unwrap_or("—");
    let mut line = format!(
        "{} {}  {} → {}",
        format_time(decision.timestamp).dimmed(),
        decision.service.bold(),
        from,
        decision.recommended_provider.green()
    );
    if let Some(region) = &decision.region {
        line.push_str(&format!(" ({})", region));
    }
    if !decision.reason.is_empty() {
        line.push_str(&format!("  {}", decision.reason.italic()));
    }
    if decision.confidence.is_some() {
        line.push_str(&format!("  [{}]", format_confidence(decision.confidence)));
    }
    line
}

/// Draws each frame as plain text on a writer (stdout in the binary)
pub struct TerminalSurface<W: Write + Send> {
    out: W,
    clear_screen: bool,
    status_text: String,
    status_class: StatusClass,
    rows: Vec<TelemetrySample>,
    decisions: Vec<Decision>,
    metrics: Vec<(String, String)>,
    notice: Option<String>,
}

impl TerminalSurface<std::io::Stdout> {
    pub fn stdout(clear_screen: bool) -> Self {
        Self::new(std::io::stdout(), clear_screen)
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W, clear_screen: bool) -> Self {
        Self {
            out,
            clear_screen,
            status_text: String::new(),
            status_class: StatusClass::Idle,
            rows: Vec::new(),
            decisions: Vec::new(),
            metrics: Vec::new(),
            notice: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn metric(&self, name: &str) -> &str {
        self.metrics
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .unwrap_or("—")
    }

    fn badge(&self) -> String {
        let text = format!(" {} ", self.status_text);
        match self.status_class {
            StatusClass::Live => text.black().on_green().to_string(),
            StatusClass::Demo => text.black().on_yellow().to_string(),
            StatusClass::Idle => text.white().on_bright_black().to_string(),
        }
    }

    fn compose(&self) -> String {
        let mut screen = String::new();
        if self.clear_screen {
            screen.push_str(CLEAR_SCREEN);
        }

        screen.push_str(&format!("{}  {}\n\n", "Placement Dashboard".bold(), self.badge()));
        screen.push_str(&format!(
            "Spend/min {}   Spend/hr {}   Avg latency {} ms   Services {}   Confidence {}   Savings {}\n\n",
            self.metric(metric_names::SPEND).cyan(),
            self.metric(metric_names::HOURLY_SPEND).cyan(),
            self.metric(metric_names::LATENCY),
            self.metric(metric_names::SERVICES),
            self.metric(metric_names::CONFIDENCE),
            self.metric(metric_names::SAVINGS),
        ));

        if self.rows.is_empty() {
            screen.push_str(&format!("{}\n", "No telemetry yet".yellow()));
        } else {
            let rows: Vec<TelemetryRow> = self.rows.iter().map(TelemetryRow::from).collect();
            screen.push_str(&Table::new(rows).with(Style::rounded()).to_string());
            screen.push('\n');
        }

        screen.push_str(&format!("\n{}\n", "Decisions".bold()));
        if self.decisions.is_empty() {
            screen.push_str(&format!("{}\n", "No decisions yet".dimmed()));
        }
        for decision in &self.decisions {
            screen.push_str(&format_decision(decision));
            screen.push('\n');
        }

        if let Some(notice) = &self.notice {
            screen.push_str(&format!("\n{} {}\n", "›".blue().bold(), notice));
        }
        screen
    }
}

impl<W: Write + Send> RenderSurface for TerminalSurface<W> {
    fn set_status_text(&mut self, text: &str) {
        self.status_text = text.to_string();
    }

    fn set_status_class(&mut self, class: StatusClass) {
        self.status_class = class;
    }

    fn replace_table_rows(&mut self, rows: &[TelemetrySample]) {
        self.rows = rows.to_vec();
    }

    fn replace_decision_list(&mut self, items: &[Decision]) {
        self.decisions = items.to_vec();
    }

    fn set_metric_text(&mut self, name: &str, value: &str) {
        match self.metrics.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.metrics.push((name.to_string(), value.to_string())),
        }
    }

    fn set_notice(&mut self, text: &str) {
        self.notice = Some(text.to_string());
    }

    fn present(&mut self) {
        let screen = self.compose();
        if let Err(e) = self
            .out
            .write_all(screen.as_bytes())
            .and_then(|_| self.out.flush())
        {
            tracing::warn!(error = %e, "Failed to draw frame");
        }
    }
}
