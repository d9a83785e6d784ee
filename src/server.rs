//! # Webhook Server
//!
//! The `axum` router that receives alert webhooks. It exposes:
//!
//! - `GET /`: a liveness probe returning the service name.
//! - `POST /alert`: accepts an alert group and runs every configured
//!   forwarder over it. The caller gets an acknowledgement once the body
//!   parses; downstream failures are only logged.
//! - `GET /metrics`: Prometheus exposition, when metrics are enabled.

use crate::core::{AlertGroup, PayloadError};
use crate::internal_metrics;
use crate::notification::Forwarder;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument, warn, Instrument};

/// Shared, read-only state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub service_name: Arc<str>,
    /// Forwarders run in order for every accepted payload.
    pub forwarders: Arc<[Arc<dyn Forwarder>]>,
    pub metrics: Option<PrometheusHandle>,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(health))
        .route("/alert", post(receive_alert));

    if let Some(handle) = state.metrics.clone() {
        router = router.route("/metrics", get(move || async move { handle.render() }));
    }

    router.with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "service": &*state.service_name }))
}

#[instrument(skip_all, fields(bytes = body.len()))]
async fn receive_alert(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, PayloadError> {
    let group = match AlertGroup::from_slice(&body) {
        Ok(group) => group,
        Err(e) => {
            warn!(error = %e, payload = %String::from_utf8_lossy(&body), "Rejected alert payload");
            internal_metrics::record_payload_rejected();
            return Err(e);
        }
    };

    info!(payload = %String::from_utf8_lossy(&body), "Received alert");
    internal_metrics::record_payload_received(group.alerts.len());

    // Forwarding runs in its own task so that a caller hanging up does not
    // cancel outbound calls already in flight.
    let forwarding = tokio::spawn(forward_all(state.forwarders.clone(), group).in_current_span());
    if let Err(e) = forwarding.await {
        error!(error = %e, "Forwarding task failed");
    }

    Ok(Json(json!({ "status": "ok" })))
}

/// Runs every forwarder over the group in order and logs each failure.
async fn forward_all(forwarders: Arc<[Arc<dyn Forwarder>]>, group: AlertGroup) {
    for forwarder in forwarders.iter() {
        let report = forwarder.forward(&group.alerts).await;
        internal_metrics::record_report(&report);
        for failure in &report.failures {
            error!(
                forwarder = report.forwarder,
                error = %failure,
                group_status = group.status(),
                "Failed to forward alerts"
            );
        }
    }
}

impl IntoResponse for PayloadError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "status": "error", "message": self.to_string() }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}
