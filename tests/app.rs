//! End-to-end tests: a real server on a loopback port, with the downstream
//! GitHub and Discord endpoints replaced by mock servers.

use chrono::{TimeZone, Utc};
use incident_webhook::{app::App, config::Config, core::FixedClock};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ISSUES_PATH: &str = "/repos/acme/ops/issues";
const WEBHOOK_PATH: &str = "/api/webhooks/1/abc";

fn config_for(github: Option<&MockServer>, discord: Option<&MockServer>) -> Config {
    let mut config = Config {
        log_file: None,
        ..Default::default()
    };
    if let Some(server) = github {
        config.tracker.token = Some("secret".to_string());
        config.tracker.repo = Some("acme/ops".to_string());
        config.tracker.api_url = server.uri();
    }
    if let Some(server) = discord {
        config.chat.webhook_url = Some(format!("{}{}", server.uri(), WEBHOOK_PATH));
    }
    config
}

async fn spawn_app(config: Config) -> SocketAddr {
    let clock = FixedClock(Utc.with_ymd_and_hms(2025, 7, 8, 19, 3, 52).unwrap());
    let app = App::builder(config).clock(Arc::new(clock)).build().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(app.serve(listener, std::future::pending()));
    addr
}

async fn post_alert(addr: SocketAddr, body: String) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{}/alert", addr))
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

fn payload(alerts: Vec<Value>) -> String {
    json!({ "version": "4", "status": "firing", "receiver": "relay", "alerts": alerts }).to_string()
}

fn alert(name: &str, severity: &str, status: &str) -> Value {
    json!({
        "status": status,
        "labels": { "alertname": name, "severity": severity, "instance": "node-1:9100" },
        "annotations": { "summary": format!("{} fired", name) },
        "startsAt": "2025-07-08T19:00:00Z"
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let addr = spawn_app(config_for(None, None)).await;

    let response = reqwest::get(format!("http://{}/", addr)).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok", "service": "incident-webhook" }));
}

#[tokio::test]
async fn test_alert_forwarded_to_both_services() {
    let github = MockServer::start().await;
    let discord = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ISSUES_PATH))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "html_url": "https://github.com/acme/ops/issues/1" })),
        )
        .expect(1)
        .mount(&github)
        .await;
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&discord)
        .await;

    let addr = spawn_app(config_for(Some(&github), Some(&discord))).await;
    let (status, body) = post_alert(
        addr,
        payload(vec![
            alert("HostDown", "critical", "firing"),
            alert("DiskFilling", "warning", "firing"),
        ]),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({ "status": "ok" }));

    let issues = github.received_requests().await.unwrap();
    let issue: Value = issues[0].body_json().unwrap();
    assert_eq!(issue["title"], "[critical] HostDown on node-1:9100");

    let messages = discord.received_requests().await.unwrap();
    let message: Value = messages[0].body_json().unwrap();
    assert_eq!(message["username"], "Prometheus Alert");
    assert_eq!(message["embeds"].as_array().unwrap().len(), 2);
    assert_eq!(message["embeds"][0]["description"], "**Summary:** HostDown fired");
}

#[tokio::test]
async fn test_resolved_critical_alert_is_green() {
    let discord = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&discord)
        .await;

    let addr = spawn_app(config_for(None, Some(&discord))).await;
    let (status, _) = post_alert(addr, payload(vec![alert("HostDown", "critical", "resolved")])).await;

    assert_eq!(status, 200);
    let messages = discord.received_requests().await.unwrap();
    let message: Value = messages[0].body_json().unwrap();
    assert_eq!(message["embeds"][0]["color"], 3_066_993);
    assert_eq!(message["embeds"][0]["fields"][1]["value"], "RESOLVED");
}

#[tokio::test]
async fn test_twenty_three_alerts_make_three_batches() {
    let discord = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .respond_with(ResponseTemplate::new(204))
        .expect(3)
        .mount(&discord)
        .await;

    let alerts = (0..23)
        .map(|i| alert(&format!("Alert{}", i), "info", "firing"))
        .collect();
    let addr = spawn_app(config_for(None, Some(&discord))).await;
    let (status, _) = post_alert(addr, payload(alerts)).await;

    assert_eq!(status, 200);
    let sizes: Vec<usize> = discord
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.body_json::<Value>().unwrap()["embeds"].as_array().unwrap().len())
        .collect();
    assert_eq!(sizes, vec![10, 10, 3]);
}

#[tokio::test]
async fn test_critical_alert_without_tracker_config() {
    // The GitHub mock is running but the relay has no credentials for it.
    let github = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(0)
        .mount(&github)
        .await;

    let mut config = config_for(None, None);
    config.tracker.api_url = github.uri();
    config.tracker.repo = Some("acme/ops".to_string());

    let addr = spawn_app(config).await;
    let (status, body) = post_alert(addr, payload(vec![alert("HostDown", "critical", "firing")])).await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_downstream_failures_do_not_affect_response() {
    let github = MockServer::start().await;
    let discord = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&github)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&discord)
        .await;

    let addr = spawn_app(config_for(Some(&github), Some(&discord))).await;
    let (status, body) = post_alert(addr, payload(vec![alert("HostDown", "critical", "firing")])).await;

    // The tracker failed but the chat path still ran and the caller got an ack.
    assert_eq!(status, 200);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_forwarding_completes_after_caller_disconnects() {
    let github = MockServer::start().await;
    let discord = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ISSUES_PATH))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "html_url": "u" }))
                .set_delay(Duration::from_millis(800)),
        )
        .expect(3)
        .mount(&github)
        .await;
    Mock::given(method("POST"))
        .and(path(WEBHOOK_PATH))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&discord)
        .await;

    let addr = spawn_app(config_for(Some(&github), Some(&discord))).await;
    let alerts = (0..3)
        .map(|i| alert(&format!("HostDown{}", i), "critical", "firing"))
        .collect();

    // The caller gives up long before the slow tracker answers.
    let result = reqwest::Client::builder()
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap()
        .post(format!("http://{}/alert", addr))
        .header("Content-Type", "application/json")
        .body(payload(alerts))
        .send()
        .await;
    assert!(result.unwrap_err().is_timeout());

    let mut issues = 0;
    let mut messages = 0;
    for _ in 0..50 {
        issues = github.received_requests().await.unwrap().len();
        messages = discord.received_requests().await.unwrap().len();
        if issues == 3 && messages == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(issues, 3);
    assert_eq!(messages, 1);
}

#[tokio::test]
async fn test_unreachable_downstream_still_acknowledged() {
    let mut config = config_for(None, None);
    config.chat.webhook_url = Some("http://127.0.0.1:1/webhook".to_string());

    let addr = spawn_app(config).await;
    let (status, body) = post_alert(addr, payload(vec![alert("X", "info", "firing")])).await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_empty_alert_list_is_acknowledged() {
    let discord = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&discord)
        .await;

    let addr = spawn_app(config_for(None, Some(&discord))).await;
    let (status, _) = post_alert(addr, json!({ "status": "resolved" }).to_string()).await;

    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_malformed_payload_is_rejected() {
    let addr = spawn_app(config_for(None, None)).await;

    let (status, body) = post_alert(addr, "{not json".to_string()).await;
    assert_eq!(status, 400);
    assert_eq!(body["status"], "error");

    let (status, body) = post_alert(addr, "[1, 2, 3]".to_string()).await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "payload must be a JSON object");
}

#[tokio::test]
async fn test_metrics_endpoint_absent_when_disabled() {
    let addr = spawn_app(config_for(None, None)).await;

    let response = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn test_metrics_endpoint_served_when_enabled() {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .build_recorder()
        .handle();
    let app = App::builder(config_for(None, None))
        .metrics(Some(handle))
        .build()
        .unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(app.serve(listener, std::future::pending()));

    let response = reqwest::get(format!("http://{}/metrics", addr)).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
}
