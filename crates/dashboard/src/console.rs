//! Operator console
//!
//! Line-oriented commands read from stdin while the dashboard runs:
//!
//! ```text
//! deploy <service> <small|medium|large> [region]
//! price <small|medium|large> [region]
//! force on|off
//! close-ws
//! connect-ws
//! reset
//! status
//! quit
//! ```

use anyhow::Result;
use dashboard_lib::{DashboardHandle, DeployRequestClient, SizeTier};
use std::str::FromStr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

const USAGE: &str = "commands: deploy <service> <size> [region] | price <size> [region] | force on|off | close-ws | connect-ws | reset | status | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Deploy {
        service: String,
        size: SizeTier,
        region: Option<String>,
    },
    Price {
        size: SizeTier,
        region: Option<String>,
    },
    ForceDemo(bool),
    CloseWebSocket,
    ConnectWebSocket,
    Reset,
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let region = |index: usize| words.get(index).map(|r| r.to_string());

        match words.as_slice() {
            ["deploy", service, size, ..] if words.len() <= 4 => Ok(Command::Deploy {
                service: service.to_string(),
                size: size.parse()?,
                region: region(3),
            }),
            ["deploy", ..] => Err("usage: deploy <service> <small|medium|large> [region]".to_string()),
            ["price", size, ..] if words.len() <= 3 => Ok(Command::Price {
                size: size.parse()?,
                region: region(2),
            }),
            ["price", ..] => Err("usage: price <small|medium|large> [region]".to_string()),
            ["force", "on"] => Ok(Command::ForceDemo(true)),
            ["force", "off"] => Ok(Command::ForceDemo(false)),
            ["force", ..] => Err("usage: force on|off".to_string()),
            ["close-ws"] => Ok(Command::CloseWebSocket),
            ["connect-ws"] => Ok(Command::ConnectWebSocket),
            ["reset"] => Ok(Command::Reset),
            ["status"] => Ok(Command::Status),
            ["help"] | ["?"] => Ok(Command::Help),
            ["quit"] | ["exit"] => Ok(Command::Quit),
            [] => Err(USAGE.to_string()),
            [other, ..] => Err(format!("unknown command '{}'; {}", other, USAGE)),
        }
    }
}

/// Whether the console keeps reading after a command
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console {
    deploy: DeployRequestClient,
    handle: DashboardHandle,
}

impl Console {
    pub fn new(deploy: DeployRequestClient, handle: DashboardHandle) -> Self {
        Self { deploy, handle }
    }

    /// Read commands until `quit` or end of input.
    ///
    /// Returns true if the operator asked to quit.
    pub async fn run<R: AsyncBufRead + Unpin>(&self, input: R) -> Result<bool> {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match line.parse::<Command>() {
                Ok(command) => {
                    debug!(command = ?command, "Console command");
                    if self.execute(command).await? == Flow::Quit {
                        info!("Quit requested from console");
                        return Ok(true);
                    }
                }
                Err(usage) => self.handle.notice(usage).await?,
            }
        }

        info!("Console input closed");
        Ok(false)
    }

    pub async fn execute(&self, command: Command) -> Result<Flow> {
        match command {
            Command::Deploy {
                service,
                size,
                region,
            } => {
                // the failure is already on the notice line
                if let Err(e) = self
                    .deploy
                    .request_deploy(&service, size, region.as_deref())
                    .await
                {
                    warn!(error = %e, "Deploy command failed");
                }
            }
            Command::Price { size, region } => {
                if let Err(e) = self.deploy.request_price(size, region.as_deref()).await {
                    warn!(error = %e, "Price command failed");
                }
            }
            Command::ForceDemo(forced) => self.handle.set_force_demo(forced).await?,
            Command::CloseWebSocket => self.handle.close_websocket().await?,
            Command::ConnectWebSocket => self.handle.connect_websocket().await?,
            Command::Reset => self.handle.reset().await?,
            Command::Status => {
                let snapshot = self.handle.snapshot().await?;
                self.handle
                    .notice(format!(
                        "{}: {} samples, {} decisions, demo {}{}",
                        snapshot.status,
                        snapshot.telemetry_len,
                        snapshot.decisions_len,
                        if snapshot.demo_active { "on" } else { "off" },
                        if snapshot.demo_forced { " (forced)" } else { "" },
                    ))
                    .await?;
            }
            Command::Help => self.handle.notice(USAGE).await?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}
