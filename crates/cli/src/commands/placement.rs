//! Deploy and price requests

use anyhow::{Context, Result};
use colored::Colorize;
use dashboard_lib::{ApiClient, BackendApi, DeployRequest, PriceRequest, SizeTier};
use tabled::Tabled;

use crate::output::{
    color_confidence, format_cost, print_info, print_json, print_success, print_table,
    OutputFormat,
};

#[derive(Tabled)]
struct PriceRow {
    #[tabled(rename = "Provider")]
    provider: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Cost/min")]
    cost: String,
}

fn deploy_body(service: &str, size: SizeTier, region: Option<String>) -> DeployRequest {
    let resources = size.resources();
    DeployRequest {
        service: service.to_string(),
        cpu: resources.cpu,
        memory: resources.memory,
        region,
    }
}

/// Ask the backend where a service of the given size should run
pub async fn deploy(
    client: &ApiClient,
    service: &str,
    size: SizeTier,
    region: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let request = deploy_body(service, size, region);
    let decision = client
        .deploy_request(&request)
        .await
        .with_context(|| format!("Deploy request for '{}' failed", service))?;

    match format {
        OutputFormat::Json => print_json(&decision)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Recommended provider for {}: {}",
                service.bold(),
                decision.recommended_provider.green().bold()
            ));
            println!(
                "  Size:        {} ({} vCPU, {} MB)",
                size, request.cpu, request.memory
            );
            if let Some(region) = &decision.region {
                println!("  Region:      {}", region);
            }
            if let Some(cost) = decision.estimated_cost_per_min {
                println!("  Est. cost:   {}/min", format_cost(cost));
            }
            println!("  Confidence:  {}", color_confidence(decision.confidence));
            if !decision.reason.is_empty() {
                println!("  Reason:      {}", decision.reason);
            }
        }
    }

    Ok(())
}

/// Compare per-minute prices across providers
pub async fn price(
    client: &ApiClient,
    size: SizeTier,
    region: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let resources = size.resources();
    let request = PriceRequest {
        cpu: resources.cpu,
        memory: resources.memory,
        region,
    };
    let table = client.price(&request).await.context("Price lookup failed")?;

    if format == OutputFormat::Table {
        print_info(&format!(
            "Prices for a {} instance ({} vCPU, {} MB)",
            size, resources.cpu, resources.memory
        ));
    }

    let rows: Vec<PriceRow> = table
        .iter()
        .map(|(provider, quote)| PriceRow {
            provider: provider.clone(),
            region: quote.region.clone().unwrap_or_else(|| "-".to_string()),
            cost: format_cost(quote.cost_per_min),
        })
        .collect();

    print_table(rows, &table, format)
}
