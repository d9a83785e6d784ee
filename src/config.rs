//! Configuration management for the incident webhook
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer built-in defaults, an optional TOML file,
//! environment variables and command-line arguments.

use crate::cli::Cli;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Append-only log file. Its directory is created on startup.
    pub log_file: Option<PathBuf>,
    /// Configuration for the HTTP listener.
    pub server: ServerConfig,
    /// Configuration for the Prometheus endpoint.
    pub metrics: MetricsConfig,
    /// Configuration for the GitHub issue tracker.
    pub tracker: TrackerConfig,
    /// Configuration for the Discord webhook.
    pub chat: ChatConfig,
}

/// Configuration for the HTTP listener.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// The address to accept alert webhooks on.
    pub listen_address: SocketAddr,
    /// Name reported by the health endpoint.
    pub service_name: String,
}

/// Configuration for the Prometheus endpoint.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct MetricsConfig {
    /// Serve `/metrics` on the main listener.
    pub enabled: bool,
}

/// Configuration for the GitHub issue tracker.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Personal access token. Read from `GITHUB_TOKEN`.
    pub token: Option<String>,
    /// Target repository as `owner/name`. Read from `GITHUB_REPO`.
    pub repo: Option<String>,
    /// Base URL of the GitHub REST API.
    pub api_url: String,
    pub timeout_seconds: u64,
}

impl TrackerConfig {
    /// Returns `(token, repo)` when both are set and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.token.as_deref().filter(|t| !t.is_empty())?;
        let repo = self.repo.as_deref().filter(|r| !r.is_empty())?;
        Some((token, repo))
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            token: None,
            repo: None,
            api_url: "https://api.github.com".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Configuration for the Discord webhook.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChatConfig {
    /// Incoming webhook URL. Read from `DISCORD_WEBHOOK_URL`.
    pub webhook_url: Option<String>,
    /// Display name used for posted messages.
    pub username: String,
    pub timeout_seconds: u64,
}

impl ChatConfig {
    /// The webhook URL if it is set and non-empty.
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook_url.as_deref().filter(|u| !u.is_empty())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            username: "Prometheus Alert".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Config {
    /// Loads the application configuration.
    ///
    /// Sources are merged in order, later ones winning: defaults, the TOML
    /// file named on the command line, the plain `GITHUB_TOKEN`,
    /// `GITHUB_REPO` and `DISCORD_WEBHOOK_URL` variables,
    /// `INCIDENT_WEBHOOK_`-prefixed variables, and finally CLI flags.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = &cli.config {
            figment = figment.merge(Toml::file(path));
        }
        let config: Config = figment
            .merge(plain_env("GITHUB_TOKEN", "tracker.token"))
            .merge(plain_env("GITHUB_REPO", "tracker.repo"))
            .merge(plain_env("DISCORD_WEBHOOK_URL", "chat.webhook_url"))
            // e.g. INCIDENT_WEBHOOK_SERVER__LISTEN_ADDRESS=127.0.0.1:8080
            .merge(Env::prefixed("INCIDENT_WEBHOOK_").split("__"))
            .merge(cli)
            .extract()?;
        Ok(config)
    }
}

/// Maps a single unprefixed environment variable onto a config key.
fn plain_env(var: &str, key: &'static str) -> Env {
    Env::raw().only(&[var]).map(move |_| key.into())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: Some(PathBuf::from("/var/log/alerts/alerts.log")),
            server: ServerConfig {
                listen_address: SocketAddr::from(([0, 0, 0, 0], 5000)),
                service_name: "incident-webhook".to_string(),
            },
            metrics: MetricsConfig::default(),
            tracker: TrackerConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}
