//! nui-relay command line entry point

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use nui_relay::logging::DEFAULT_LOG_FILTER;
use nui_relay::{CdpClient, EventSubscription, LogConfig, RelayConfig, SubscriptionSet};

/// Relay NUI telemetry from a devtools endpoint
#[derive(Parser)]
#[command(name = "nui-relay")]
#[command(version)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the target listing URL
    #[arg(long)]
    discovery_url: Option<String>,

    /// Stream to request, by wire id (repeatable, sent in order)
    #[arg(short, long = "subscribe", value_name = "WIRE_ID")]
    subscriptions: Vec<EventSubscription>,

    /// Log filter directives (RUST_LOG takes precedence)
    #[arg(long, default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,

    /// Disable colored log output
    #[arg(long)]
    no_ansi: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    LogConfig { filter: args.log_filter.clone(), ansi: !args.no_ansi, ..LogConfig::default() }
        .init()
        .context("failed to set up logging")?;

    let mut config = match &args.config {
        Some(path) => RelayConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RelayConfig::default(),
    };
    if let Some(url) = args.discovery_url {
        config.discovery_url = url;
    }
    if !args.subscriptions.is_empty() {
        config.subscriptions = SubscriptionSet::from(args.subscriptions);
    }
    config.validate().context("invalid configuration")?;

    let running = CancellationToken::new();
    let stop = running.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Exiting...");
            stop.cancel();
        }
    });

    let subscriptions = config.subscriptions.clone();
    let client = CdpClient::new(config, running);
    match client.entry(subscriptions).await {
        Ok(samples) => {
            info!("Relay stopped with {} samples drained", samples.len());
            Ok(())
        }
        Err(e) => {
            error!("Relay failed: {}", e);
            for hint in e.recovery_suggestions() {
                error!("  hint: {}", hint);
            }
            Err(e.into())
        }
    }
}
