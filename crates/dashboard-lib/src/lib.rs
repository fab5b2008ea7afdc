//! Dashboard library for the placement dashboard
//!
//! This crate provides the core functionality for:
//! - Bounded telemetry and decision windows
//! - Data acquisition over WebSocket, polling and a local demo feed
//! - Liveness arbitration between the three producers
//! - Summary metrics and deferred rendering
//! - Deploy and price requests against the backend
//! - Health checks and observability

pub mod aggregator;
pub mod client;
pub mod deploy;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod render;
pub mod summary;
pub mod transport;
pub mod window;

pub use aggregator::UpdateAggregator;
pub use client::{resolve_api_base, ApiClient, BackendApi};
pub use deploy::DeployRequestClient;
pub use error::{DashboardError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ClientMetrics, StructuredLogger};
pub use render::{RenderSurface, StatusClass};
pub use summary::SummaryMetrics;
pub use transport::{
    DashboardHandle, DashboardSnapshot, SupervisorBuilder, TransportConfig, TransportState,
    TransportSupervisor,
};
pub use window::{BoundedWindow, DecisionWindow, TelemetryWindow};
