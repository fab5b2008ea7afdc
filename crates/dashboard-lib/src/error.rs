//! Error taxonomy for the dashboard client
//!
//! Errors fall into three groups that are handled differently:
//! - transient network failures are logged and retried by the next scheduled attempt
//! - protocol failures drop the offending payload and leave the connection alone
//! - user-action failures are surfaced as a visible notice and never retried

use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("malformed payload: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("dashboard event loop has stopped")]
    ChannelClosed,
}

impl DashboardError {
    /// Returns true for failures the next scheduled attempt should simply retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DashboardError::Http(_) | DashboardError::Status { .. } | DashboardError::WebSocket(_)
        )
    }

    /// Returns true when the payload itself could not be understood
    pub fn is_protocol(&self) -> bool {
        matches!(self, DashboardError::Protocol(_))
    }
}
