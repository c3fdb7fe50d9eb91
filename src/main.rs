//! CLI Entry Point for ua_poller
//!
//! Connects to one endpoint and logs the configured node values every ten
//! seconds until interrupted with Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! ua_poller --endpoint opc.tcp://localhost:14840 --node "ns=1;i=2345"
//! ua_poller --endpoint sim://bench --node "ns=2;s=Line1.Speed" --node "ns=2;i=7"
//! ua_poller --config plant.toml --debug
//! ```
//!
//! Exits non-zero on a configuration error, an invalid node id, or a failed
//! initial connection.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use ua_poller::config::{ConfigOverrides, PollerConfig};
use ua_poller::logging::{self, LoggingConfig, OutputFormat};
use ua_poller::poller::{PollingReadClient, POLL_INTERVAL};
use ua_poller::request::build_request;
use ua_poller::transport;

#[derive(Parser)]
#[command(name = "ua_poller")]
#[command(about = "Poll OPC UA node values on a fixed interval", long_about = None)]
struct Cli {
    /// OPC UA Endpoint URL [default: opc.tcp://localhost:14840]
    #[arg(long)]
    endpoint: Option<String>,

    /// NodeID to read; repeat for several nodes [default: ns=1;i=2345]
    #[arg(long = "node")]
    nodes: Vec<String>,

    /// Enable verbose protocol logging in the transport
    #[arg(long)]
    debug: bool,

    /// Optional TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
    log_format: OutputFormat,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            endpoint: self.endpoint.clone(),
            nodes: (!self.nodes.is_empty()).then(|| self.nodes.clone()),
            debug: self.debug.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(PollerConfig::DEFAULT_PATH));
    let config = PollerConfig::load_with(&config_path, cli.overrides());

    // Logging comes up even when the config is unusable so the failure is reported.
    let logging_config = config
        .as_ref()
        .ok()
        .and_then(|c| LoggingConfig::from_poller_config(c).ok())
        .unwrap_or_default()
        .with_format(cli.log_format)
        .with_transport_debug(cli.debug || config.as_ref().is_ok_and(|c| c.debug));
    if let Err(e) = logging::init(logging_config) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let result = match config {
        Ok(config) if cli.print_config => print_config(&config),
        Ok(config) => poll(config).await,
        Err(e) => Err(e).with_context(|| format!("loading {}", config_path.display())),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_config(config: &PollerConfig) -> Result<()> {
    println!("{}", config.to_toml()?);
    Ok(())
}

async fn poll(config: PollerConfig) -> Result<()> {
    config.validate()?;
    let endpoint = config.endpoint()?;
    let nodes = config.node_ids()?;
    let request = build_request(&nodes);

    let connector = transport::connector_for(&endpoint, config.transport_config())?;
    let client = PollingReadClient::new(connector).with_options(config.poll_options());
    let connection = client.connect(&endpoint, config.security_mode).await?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested");
                    cancel.cancel();
                }
                Err(e) => warn!(error = %e, "Ctrl-C handler unavailable"),
            }
        }
    });

    let summary = client.run(connection, &request, POLL_INTERVAL, cancel).await;
    info!(
        ticks = summary.ticks,
        failed_reads = summary.failed_reads,
        status_warnings = summary.status_warnings,
        "Stopped"
    );
    Ok(())
}
