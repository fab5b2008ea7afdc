//! Core data models for the dashboard

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One telemetry sample reported by the backend (or synthesized in demo mode)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub cpu: f64,
    /// Memory in MB
    #[serde(default)]
    pub memory: f64,
    #[serde(default)]
    pub latency_ms: i64,
    #[serde(default)]
    pub cost_per_min: f64,
}

/// A placement decision pushed by the backend or returned by a deploy request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub service: String,
    #[serde(
        default,
        alias = "from_provider",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_provider: Option<String>,
    #[serde(default)]
    pub recommended_provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub reason: String,
    /// Confidence in [0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost_per_min: Option<f64>,
}

/// Frame pushed over the WebSocket; either tail may be absent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry_tail: Option<Vec<TelemetrySample>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decisions_tail: Option<Vec<Decision>>,
}

/// Requested deployment size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeTier {
    Small,
    Medium,
    Large,
}

/// CPU and memory derived from a size tier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceRequest {
    /// vCPU
    pub cpu: f64,
    /// MB
    pub memory: f64,
}

impl SizeTier {
    pub fn resources(&self) -> ResourceRequest {
        match self {
            SizeTier::Small => ResourceRequest {
                cpu: 0.5,
                memory: 128.0,
            },
            SizeTier::Medium => ResourceRequest {
                cpu: 1.0,
                memory: 256.0,
            },
            SizeTier::Large => ResourceRequest {
                cpu: 2.0,
                memory: 512.0,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeTier::Small => "small",
            SizeTier::Medium => "medium",
            SizeTier::Large => "large",
        }
    }
}

impl fmt::Display for SizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "small" => Ok(SizeTier::Small),
            "medium" => Ok(SizeTier::Medium),
            "large" => Ok(SizeTier::Large),
            other => Err(format!(
                "unknown size '{}' (expected small, medium or large)",
                other
            )),
        }
    }
}

/// Body of `POST /deploy_request`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    pub service: String,
    pub cpu: f64,
    pub memory: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Body of `POST /price`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRequest {
    pub cpu: f64,
    pub memory: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Per-provider entry of a price lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    #[serde(default)]
    pub cost_per_min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Provider name to estimated price
pub type PriceTable = BTreeMap<String, PriceQuote>;

/// Response of `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendStatus {
    #[serde(default)]
    pub telemetry_count: u64,
    #[serde(default)]
    pub decisions_count: u64,
    #[serde(default)]
    pub ws_active: u64,
}
