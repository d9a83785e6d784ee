//! The main application logic, decoupled from the entry point.

use crate::{
    config::Config,
    core::{Clock, SystemClock},
    notification::{
        discord::{ChatNotifier, DiscordWebhookClient},
        github::{GithubIssueClient, TrackerForwarder},
        Forwarder,
    },
    server::{self, AppState},
};
use anyhow::{Context, Result};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, trace};

/// A fully wired application, ready to serve.
pub struct App {
    state: AppState,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// Names of the enabled forwarders, in the order they run.
    pub fn forwarder_names(&self) -> Vec<&'static str> {
        self.state.forwarders.iter().map(|f| f.name()).collect()
    }

    pub fn router(&self) -> Router {
        server::router(self.state.clone())
    }

    /// Serves requests on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        info!(%addr, "Listening for alert webhooks");
        axum::serve(listener, self.router().into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .context("webhook server failed")?;
        trace!("Webhook server finished.");
        Ok(())
    }
}

/// Builder for the main application.
///
/// Forwarders are created only for the downstream services that are
/// configured; a missing token, repository or webhook URL leaves that path
/// out entirely.
pub struct AppBuilder {
    config: Config,
    clock: Arc<dyn Clock>,
    metrics: Option<PrometheusHandle>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            metrics: None,
        }
    }

    /// Overrides the clock used for card timestamps.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Exposes `/metrics` using the given recorder handle.
    pub fn metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }

    pub fn build(self) -> Result<App> {
        let mut forwarders: Vec<Arc<dyn Forwarder>> = Vec::new();

        match GithubIssueClient::from_config(&self.config.tracker)
            .context("failed to build GitHub client")?
        {
            Some(client) => {
                info!(
                    repo = self.config.tracker.repo.as_deref().unwrap_or_default(),
                    "GitHub issue forwarding enabled"
                );
                forwarders.push(Arc::new(TrackerForwarder::new(Arc::new(client))));
            }
            None => info!("GitHub issue forwarding disabled"),
        }

        match DiscordWebhookClient::from_config(&self.config.chat)
            .context("failed to build Discord client")?
        {
            Some(client) => {
                info!("Discord forwarding enabled");
                forwarders.push(Arc::new(ChatNotifier::new(
                    Arc::new(client),
                    self.config.chat.username.clone(),
                    self.clock.clone(),
                )));
            }
            None => info!("Discord forwarding disabled"),
        }

        Ok(App {
            state: AppState {
                service_name: self.config.server.service_name.as_str().into(),
                forwarders: forwarders.into(),
                metrics: self.metrics,
            },
        })
    }
}
