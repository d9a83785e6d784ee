//! Incident Webhook - Alert relay
//!
//! Receives Alertmanager webhooks and forwards them to GitHub issues and a
//! Discord channel.

use anyhow::{Context, Result};
use clap::Parser;
use incident_webhook::{app::App, cli::Cli, config::Config, internal_metrics, logging};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        // Logging is configured from the config, so fall back to a plain
        // stdout subscriber for this one error.
        tracing_subscriber::fmt().init();
        error!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });

    let _log_guard = logging::init(&config)?;

    info!("Incident webhook starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    match &config.log_file {
        Some(path) => info!("Log File: {}", path.display()),
        None => info!("Log File: Disabled"),
    }
    info!("Listen Address: {}", config.server.listen_address);
    info!("Service Name: {}", config.server.service_name);
    info!(
        "Metrics Endpoint: {}",
        if config.metrics.enabled { "Enabled" } else { "Disabled" }
    );
    info!(
        "GitHub Repository: {}",
        config.tracker.repo.as_deref().unwrap_or("Not configured")
    );
    info!(
        "Discord Webhook: {}",
        if config.chat.webhook_url().is_some() {
            "Configured"
        } else {
            "Not configured"
        }
    );
    info!("-------------------------------------------------------");

    let metrics_handle = if config.metrics.enabled {
        Some(internal_metrics::install()?)
    } else {
        None
    };

    let app = App::builder(config.clone())
        .metrics(metrics_handle)
        .build()?;

    let listener = TcpListener::bind(config.server.listen_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen_address))?;

    app.serve(listener, shutdown_signal()).await?;

    info!("Shut down cleanly. Exiting.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received. Shutting down gracefully...");
}
