//! Forwarding of received alerts to downstream notification services.
//!
//! Each downstream path is a [`Forwarder`]. Forwarders never fail the
//! request that triggered them: every outbound call is attempted and its
//! outcome is recorded in a [`ForwardReport`] for the caller to log.
pub mod discord;
pub mod github;

use crate::core::Alert;
use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single outbound call.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("downstream rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ForwardError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ForwardError::Transport(e) if e.is_timeout())
    }
}

/// The outcome of running one forwarder over a payload.
#[derive(Debug)]
pub struct ForwardReport {
    /// Name of the forwarder that produced the report.
    pub forwarder: &'static str,
    /// Number of outbound calls that were made.
    pub attempted: usize,
    /// Number of outbound calls the downstream service accepted.
    pub delivered: usize,
    pub failures: Vec<ForwardError>,
}

impl ForwardReport {
    pub fn new(forwarder: &'static str) -> Self {
        Self {
            forwarder,
            attempted: 0,
            delivered: 0,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, result: Result<(), ForwardError>) {
        self.attempted += 1;
        match result {
            Ok(()) => self.delivered += 1,
            Err(e) => self.failures.push(e),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A downstream notification path.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// A short name used in logs and metrics, e.g. "tracker" or "chat".
    fn name(&self) -> &'static str;

    /// Forwards the alerts of one payload. Failures are reported, not raised.
    async fn forward(&self, alerts: &[Alert]) -> ForwardReport;
}
