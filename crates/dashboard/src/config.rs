//! Dashboard configuration

use anyhow::{Context, Result};
use dashboard_lib::{resolve_api_base, ApiClient, TransportConfig};
use serde::Deserialize;
use std::time::Duration;

/// Dashboard configuration, read from `DASHBOARD_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Name used in structured logs
    #[serde(default = "default_instance")]
    pub instance: String,

    /// Backend base URL for the request/response calls
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Origin the frontend is served from; overrides `base_url` when set
    #[serde(default)]
    pub origin: Option<String>,

    /// Push endpoint; derived from `base_url` when unset
    #[serde(default)]
    pub ws_url: Option<String>,

    /// Run on polling and the demo feed only
    #[serde(default)]
    pub disable_ws: bool,

    /// Port for health/metrics/snapshot
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_initial_poll_delay")]
    pub initial_poll_delay_ms: u64,

    #[serde(default = "default_liveness_interval")]
    pub liveness_interval_ms: u64,

    #[serde(default = "default_demo_tick")]
    pub demo_tick_ms: u64,

    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u64,

    /// Failed connects in a row before the push channel reports unhealthy
    #[serde(default = "default_ws_unhealthy_after")]
    pub ws_unhealthy_after: u32,

    /// Keep the demo feed on even while live data flows
    #[serde(default)]
    pub force_demo: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Redraw in place instead of appending frames to the terminal
    #[serde(default = "default_clear_screen")]
    pub clear_screen: bool,
}

fn default_instance() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "dashboard".to_string())
}

fn default_base_url() -> String {
    "http://127.0.0.1:8001".to_string()
}

fn default_api_port() -> u16 {
    9102
}

fn default_poll_interval() -> u64 {
    4000
}

fn default_initial_poll_delay() -> u64 {
    1200
}

fn default_liveness_interval() -> u64 {
    5000
}

fn default_demo_tick() -> u64 {
    4500
}

fn default_frame_interval() -> u64 {
    16
}

fn default_ws_unhealthy_after() -> u32 {
    5
}

fn default_request_timeout() -> u64 {
    10
}

fn default_clear_screen() -> bool {
    true
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            instance: default_instance(),
            base_url: default_base_url(),
            origin: None,
            ws_url: None,
            disable_ws: false,
            api_port: default_api_port(),
            poll_interval_ms: default_poll_interval(),
            initial_poll_delay_ms: default_initial_poll_delay(),
            liveness_interval_ms: default_liveness_interval(),
            demo_tick_ms: default_demo_tick(),
            frame_interval_ms: default_frame_interval(),
            ws_unhealthy_after: default_ws_unhealthy_after(),
            force_demo: false,
            request_timeout_secs: default_request_timeout(),
            clear_screen: default_clear_screen(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("DASHBOARD").try_parsing(true))
            .build()
            .context("failed to read DASHBOARD_* environment")?;

        config
            .try_deserialize()
            .context("invalid dashboard configuration")
    }

    /// Backend base URL, resolved from `origin` when one is configured
    pub fn effective_base_url(&self) -> Result<String> {
        match &self.origin {
            Some(origin) => {
                let origin = url::Url::parse(origin)
                    .with_context(|| format!("invalid origin '{}'", origin))?;
                Ok(resolve_api_base(&origin).to_string())
            }
            None => Ok(self.base_url.clone()),
        }
    }

    pub fn api_client(&self) -> Result<ApiClient> {
        let base_url = self.effective_base_url()?;
        ApiClient::with_timeout(&base_url, Duration::from_secs(self.request_timeout_secs))
            .with_context(|| format!("invalid base URL '{}'", base_url))
    }

    /// Transport timings plus the resolved push endpoint
    pub fn transport_config(&self, api: &ApiClient) -> Result<TransportConfig> {
        let push_url = if self.disable_ws {
            None
        } else {
            match &self.ws_url {
                Some(url) => Some(url.clone()),
                None => Some(
                    api.push_url()
                        .context("cannot derive push URL from base URL")?
                        .to_string(),
                ),
            }
        };

        Ok(TransportConfig {
            push_url,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            initial_poll_delay: Duration::from_millis(self.initial_poll_delay_ms),
            liveness_interval: Duration::from_millis(self.liveness_interval_ms),
            demo_tick: Duration::from_millis(self.demo_tick_ms),
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            ws_unhealthy_after: self.ws_unhealthy_after,
            force_demo: self.force_demo,
            ..TransportConfig::default()
        })
    }
}
