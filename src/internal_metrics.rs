//! # Internal Metrics
//!
//! Counters describing how many payloads were received and how the outbound
//! calls fared. The `metrics` macros are no-ops until a recorder is
//! installed, so handlers record unconditionally and [`install`] decides
//! whether anything is collected.

use crate::notification::ForwardReport;
use anyhow::{anyhow, Result};
use metrics::Unit;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Installs a global Prometheus recorder and returns the handle used to
/// render the `/metrics` endpoint.
pub fn install() -> Result<PrometheusHandle> {
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|_| anyhow!("a global metrics recorder is already installed"))?;
    describe();
    Ok(handle)
}

/// Registers descriptions for all counters with the global recorder.
pub fn describe() {
    metrics::describe_counter!("alert_payloads_received_total", Unit::Count, "Total number of webhook payloads accepted.");
    metrics::describe_counter!("alert_payloads_rejected_total", Unit::Count, "Total number of webhook payloads rejected as malformed.");
    metrics::describe_counter!("alerts_received_total", Unit::Count, "Total number of individual alerts received.");
    metrics::describe_counter!("forward_requests_total", Unit::Count, "Total number of outbound calls made, labeled by forwarder.");
    metrics::describe_counter!("forward_failures_total", Unit::Count, "Total number of outbound calls that failed, labeled by forwarder.");
}

pub fn record_payload_received(alert_count: usize) {
    metrics::counter!("alert_payloads_received_total").increment(1);
    metrics::counter!("alerts_received_total").increment(alert_count as u64);
}

pub fn record_payload_rejected() {
    metrics::counter!("alert_payloads_rejected_total").increment(1);
}

pub fn record_report(report: &ForwardReport) {
    metrics::counter!("forward_requests_total", "forwarder" => report.forwarder)
        .increment(report.attempted as u64);
    metrics::counter!("forward_failures_total", "forwarder" => report.forwarder)
        .increment(report.failures.len() as u64);
}
