//! Deploy and price requests
//!
//! One-shot calls issued on operator request. A successful deploy
//! recommendation is added to the decision window directly, without waiting
//! for the backend to push it.

use crate::client::BackendApi;
use crate::error::Result;
use crate::models::{Decision, DeployRequest, PriceRequest, PriceTable, SizeTier};
use crate::observability::StructuredLogger;
use crate::transport::DashboardHandle;
use std::sync::Arc;
use tracing::warn;

pub struct DeployRequestClient {
    api: Arc<dyn BackendApi>,
    handle: DashboardHandle,
    logger: StructuredLogger,
}

impl DeployRequestClient {
    pub fn new(api: Arc<dyn BackendApi>, handle: DashboardHandle, logger: StructuredLogger) -> Self {
        Self {
            api,
            handle,
            logger,
        }
    }

    /// Ask the backend where `service` should run at the given size.
    ///
    /// The recommendation is injected into the decision window and summarized
    /// in the notice line. Failures are shown as a notice and never retried.
    pub async fn request_deploy(
        &self,
        service: &str,
        size: SizeTier,
        region: Option<&str>,
    ) -> Result<Decision> {
        let resources = size.resources();
        let request = DeployRequest {
            service: service.to_string(),
            cpu: resources.cpu,
            memory: resources.memory,
            region: region.map(str::to_string),
        };

        match self.api.deploy_request(&request).await {
            Ok(decision) => {
                self.logger.log_deploy_recommendation(
                    service,
                    size.as_str(),
                    &decision.recommended_provider,
                    decision.estimated_cost_per_min,
                );
                self.handle.notice(deploy_notice(&decision)).await?;
                self.handle.inject_decisions(vec![decision.clone()]).await?;
                Ok(decision)
            }
            Err(e) => {
                warn!(service = %service, size = %size, error = %e, "Deploy request failed");
                self.handle.notice("Request failed — see log").await?;
                Err(e)
            }
        }
    }

    /// Look up the per-minute price of a size tier across providers
    pub async fn request_price(&self, size: SizeTier, region: Option<&str>) -> Result<PriceTable> {
        let resources = size.resources();
        let request = PriceRequest {
            cpu: resources.cpu,
            memory: resources.memory,
            region: region.map(str::to_string),
        };

        match self.api.price(&request).await {
            Ok(prices) => {
                self.handle.notice(price_notice(&prices)).await?;
                Ok(prices)
            }
            Err(e) => {
                warn!(size = %size, error = %e, "Price lookup failed");
                self.handle.notice("Price lookup failed").await?;
                Err(e)
            }
        }
    }
}

pub fn deploy_notice(decision: &Decision) -> String {
    format!(
        "Recommended: {} — est ${:.6}/min",
        decision.recommended_provider,
        decision.estimated_cost_per_min.unwrap_or(0.0)
    )
}

pub fn price_notice(prices: &PriceTable) -> String {
    if prices.is_empty() {
        return "No prices returned".to_string();
    }
    prices
        .iter()
        .map(|(provider, quote)| format!("{}: ${:.6}/min", provider, quote.cost_per_min))
        .collect::<Vec<_>>()
        .join(", ")
}
