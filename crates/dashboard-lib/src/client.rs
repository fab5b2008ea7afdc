//! HTTP client for the dashboard backend

use crate::error::{DashboardError, Result};
use crate::models::{
    BackendStatus, Decision, DeployRequest, PriceRequest, PriceTable, TelemetrySample,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use url::Url;

/// Port the frontend is served from during local development
pub const DEV_FRONTEND_PORT: u16 = 8000;

/// Port the backend listens on when the frontend is served separately
pub const DEV_BACKEND_PORT: u16 = 8001;

/// Request/response calls the dashboard makes against its backend
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// `GET /telemetry`
    async fn fetch_telemetry(&self) -> Result<Vec<TelemetrySample>>;

    /// `GET /decisions`
    async fn fetch_decisions(&self) -> Result<Vec<Decision>>;

    /// `POST /deploy_request`
    async fn deploy_request(&self, request: &DeployRequest) -> Result<Decision>;

    /// `POST /price`
    async fn price(&self, request: &PriceRequest) -> Result<PriceTable>;
}

/// API client backed by reqwest
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut base_url = Url::parse(base_url)?;

        // join() replaces the last path segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// WebSocket endpoint derived from the base URL (`http`→`ws`, `https`→`wss`)
    pub fn push_url(&self) -> Result<Url> {
        let mut url = self.base_url.join("ws")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        // http(s) -> ws(s) stays within the special schemes, so this cannot fail
        let _ = url.set_scheme(scheme);
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path)?;
        let response = self.client.get(url).send().await?;
        Self::decode(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.base_url.join(path)?;
        let response = self.client.post(url).json(body).send().await?;
        Self::decode(response).await
    }

    /// `GET /status`
    pub async fn status(&self) -> Result<BackendStatus> {
        self.get("status").await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DashboardError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl BackendApi for ApiClient {
    async fn fetch_telemetry(&self) -> Result<Vec<TelemetrySample>> {
        self.get("telemetry").await
    }

    async fn fetch_decisions(&self) -> Result<Vec<Decision>> {
        self.get("decisions").await
    }

    async fn deploy_request(&self, request: &DeployRequest) -> Result<Decision> {
        self.post("deploy_request", request).await
    }

    async fn price(&self, request: &PriceRequest) -> Result<PriceTable> {
        self.post("price", request).await
    }
}

/// Pick the backend base URL for a page origin.
///
/// A frontend served from the development port talks to the backend on the
/// same host at [`DEV_BACKEND_PORT`]; anything else is same-origin.
pub fn resolve_api_base(origin: &Url) -> Url {
    let mut base = origin.clone();
    if origin.port() == Some(DEV_FRONTEND_PORT) {
        // only fails for cannot-be-a-base URLs, which have no port anyway
        let _ = base.set_port(Some(DEV_BACKEND_PORT));
    }
    base.set_path("/");
    base.set_query(None);
    base.set_fragment(None);
    base
}
