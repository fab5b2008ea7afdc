//! Placement dashboard CLI
//!
//! A command-line tool for inspecting the telemetry and decision feeds
//! the dashboard shows, and for issuing deploy and price requests.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{feed, placement};
use dashboard_lib::{ApiClient, SizeTier};

/// Placement dashboard CLI
#[derive(Parser)]
#[command(name = "dashctl")]
#[command(author, version, about = "CLI for the placement dashboard backend", long_about = None)]
pub struct Cli {
    /// Backend base URL (can also be set via DASH_API_URL env var)
    #[arg(long, env = "DASH_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show recent telemetry samples
    Telemetry {
        /// Number of samples to show
        #[arg(long, short, default_value_t = 30)]
        limit: usize,

        /// Only show samples for this service
        #[arg(long, short)]
        service: Option<String>,
    },

    /// Show recent placement decisions
    Decisions {
        /// Number of decisions to show
        #[arg(long, short, default_value_t = 10)]
        limit: usize,
    },

    /// Request a placement for a service
    Deploy {
        /// Service name
        #[arg(long, short)]
        service: String,

        /// Instance size (small, medium, large)
        #[arg(long)]
        size: SizeTier,

        /// Preferred region
        #[arg(long, short)]
        region: Option<String>,
    },

    /// Compare provider prices for an instance size
    Price {
        /// Instance size (small, medium, large)
        #[arg(long)]
        size: SizeTier,

        /// Preferred region
        #[arg(long, short)]
        region: Option<String>,
    },

    /// Show backend counters and current summary metrics
    Status,

    /// Manage the CLI configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Store the backend URL in the configuration file
    SetApiUrl {
        /// Backend base URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = config::Config::load()?;
    let format = settings.resolve_format(cli.format);

    // config commands never touch the backend
    if let Commands::Config(config_cmd) = cli.command {
        return match config_cmd {
            ConfigCommands::Show => {
                let api_url = settings.resolve_api_url(cli.api_url.as_deref())?;
                println!("api_url: {}", api_url);
                println!("format:  {:?}", format);
                println!("file:    {}", config::Config::config_path()?.display());
                Ok(())
            }
            ConfigCommands::SetApiUrl { url } => {
                settings.api_url = Some(url);
                settings.resolve_api_url(None)?;
                let path = settings.save()?;
                output::print_success(&format!("Saved {}", path.display()));
                Ok(())
            }
        };
    }

    let api_url = settings.resolve_api_url(cli.api_url.as_deref())?;
    if cli.verbose {
        output::print_info(&format!("Using backend at {}", api_url));
    }
    let client = ApiClient::new(&api_url)?;

    match cli.command {
        Commands::Telemetry { limit, service } => {
            feed::show_telemetry(&client, service, limit, format).await?;
        }
        Commands::Decisions { limit } => {
            feed::show_decisions(&client, limit, format).await?;
        }
        Commands::Deploy {
            service,
            size,
            region,
        } => {
            placement::deploy(&client, &service, size, region, format).await?;
        }
        Commands::Price { size, region } => {
            placement::price(&client, size, region, format).await?;
        }
        Commands::Status => {
            feed::show_status(&client, format).await?;
        }
        Commands::Config(_) => {}
    }

    Ok(())
}
