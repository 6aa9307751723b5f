//! Insight Daemon
//!
//! Reads telemetry snapshots (one JSON object per line on stdin), decides
//! when to ask the reasoning backend for an insight, and renders the result.

use anyhow::{Context, Result};
use clap::Parser;
use insight_common::HttpReasoningClient;
use insightd::config::Config;
use insightd::display::TerminalDisplay;
use insightd::source::JsonLinesSource;
use insightd::{BellAlertHook, ControllerSettings, HookChain, InsightController, LogAlertHook};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "insightd", version, about = "Heuristic insight trigger daemon")]
struct Cli {
    /// Config file (defaults to /etc/insightd/config.toml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Disable the terminal status display
    #[arg(long)]
    no_render: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load(),
    };

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    info!("Insight Daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let client = HttpReasoningClient::new(config.reasoning.clone())
        .context("building reasoning client")?;
    info!(
        endpoint = %config.reasoning.endpoint,
        model = %config.reasoning.model,
        "Reasoning backend configured"
    );

    let mut hooks = HookChain::new().with(LogAlertHook);
    if config.daemon.bell {
        hooks = hooks.with(BellAlertHook);
    }

    let controller = InsightController::new(ControllerSettings::from(&config), Arc::new(client))
        .with_alert_hook(Arc::new(hooks));

    let display = if config.daemon.render && !cli.no_render {
        Some(tokio::spawn(TerminalDisplay::new().run(controller.subscribe())))
    } else {
        None
    };

    let mut source = JsonLinesSource::stdin();
    let mut interrupted = false;

    loop {
        tokio::select! {
            next = source.next_snapshot() => match next {
                Ok(Some(snapshot)) => {
                    controller.on_tick(&snapshot, Instant::now());
                }
                Ok(None) => {
                    info!("Telemetry input closed");
                    break;
                }
                Err(e) => {
                    warn!("Telemetry read failed: {:#}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                interrupted = true;
                break;
            }
        }
    }

    if interrupted {
        info!("Interrupted, shutting down");
        drop(controller.shutdown());
    } else {
        // Let the last request land before exiting, unless interrupted
        let interrupt = async {
            let _ = tokio::signal::ctrl_c().await;
        };
        if controller.settled_or(interrupt).await {
            let view = controller.view();
            info!(
                requests = view.requests_issued,
                skipped_lines = source.skipped(),
                "Shutting down gracefully"
            );
        } else {
            // Dropping the controller below discards whatever that request returns
            info!("Interrupted while waiting for the last request, shutting down");
        }
        drop(controller);
    }

    if let Some(display) = display {
        let _ = display.await;
    }

    Ok(())
}
