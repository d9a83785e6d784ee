//! Core domain types for the incident webhook
//!
//! This module defines the inbound alert-group payload as delivered by an
//! Alertmanager-style webhook, the errors raised while parsing it, and the
//! clock abstraction used when an alert carries no start time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while turning a request body into an [`AlertGroup`].
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("payload must be a JSON object")]
    NotAnObject,
    #[error("payload has an unexpected shape: {0}")]
    InvalidShape(#[source] serde_json::Error),
}

/// A group of alerts received in a single webhook call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AlertGroup {
    /// Group status, e.g. "firing" or "resolved".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// The alerts in the group, in delivery order.
    #[serde(default)]
    pub alerts: Vec<Alert>,
    /// Any other group-level fields (receiver, groupKey, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AlertGroup {
    /// Parses a raw request body.
    ///
    /// The body must be a JSON object. A missing `alerts` key is read as an
    /// empty list.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_slice(body).map_err(PayloadError::InvalidJson)?;
        if !value.is_object() {
            return Err(PayloadError::NotAnObject);
        }
        serde_json::from_value(value).map_err(PayloadError::InvalidShape)
    }

    /// The group status, or "unknown" when the sender omitted it.
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("unknown")
    }
}

/// A single alert instance.
///
/// Known fields are typed; everything else is kept verbatim in `extra` so the
/// alert serializes back to the object it was parsed from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
    /// ISO-8601 start time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Alert {
    /// Returns a label value if the label is present.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.as_ref()?.get(key).map(String::as_str)
    }

    /// Returns an annotation value if the annotation is present.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.as_ref()?.get(key).map(String::as_str)
    }

    /// Returns a label value only if it is present and not empty.
    pub fn non_empty_label(&self, key: &str) -> Option<&str> {
        self.label(key).filter(|v| !v.is_empty())
    }

    /// Returns an annotation value only if it is present and not empty.
    pub fn non_empty_annotation(&self, key: &str) -> Option<&str> {
        self.annotation(key).filter(|v| !v.is_empty())
    }

    pub fn severity(&self) -> Option<&str> {
        self.label("severity")
    }

    /// The alert's own status, or "unknown" when absent.
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or("unknown")
    }

    pub fn is_critical(&self) -> bool {
        self.severity() == Some("critical")
    }

    pub fn is_resolved(&self) -> bool {
        self.status.as_deref() == Some("resolved")
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a single instant, for deterministic formatting.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
