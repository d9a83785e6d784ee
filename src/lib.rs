/// Incident Webhook - relays monitoring alerts to downstream services
///
/// This library receives Alertmanager-style alert groups over HTTP, opens
/// GitHub issues for critical alerts and posts rich notifications for every
/// alert to a Discord webhook.
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod formatting;
pub mod internal_metrics;
pub mod logging;
pub mod notification;
pub mod server;

// Re-export core types for convenience
pub use crate::core::*;
