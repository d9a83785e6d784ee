//! A client for opening GitHub issues for critical alerts.

use crate::config::TrackerConfig;
use crate::core::Alert;
use crate::formatting::TrackerIssue;
use crate::notification::{ForwardError, ForwardReport, Forwarder};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// The part of GitHub's create-issue response we care about.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CreatedIssue {
    pub html_url: Option<String>,
}

/// A trait for clients that can open tracker issues.
#[async_trait]
pub trait IssueTrackerClient: Send + Sync {
    async fn create_issue(&self, issue: &TrackerIssue) -> Result<CreatedIssue, ForwardError>;
}

/// A client for the GitHub REST issues endpoint of one repository.
pub struct GithubIssueClient {
    http: reqwest::Client,
    issues_url: String,
    token: String,
}

impl GithubIssueClient {
    /// Creates a client for `repo` (`owner/name`) under `api_url`.
    pub fn new(
        api_url: &str,
        repo: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, ForwardError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            issues_url: format!("{}/repos/{}/issues", api_url.trim_end_matches('/'), repo),
            token: token.to_string(),
        })
    }

    /// Builds a client from the tracker configuration. Returns `Ok(None)`
    /// when the token or repository is missing.
    pub fn from_config(config: &TrackerConfig) -> Result<Option<Self>, ForwardError> {
        let Some((token, repo)) = config.credentials() else {
            return Ok(None);
        };
        Self::new(
            &config.api_url,
            repo,
            token,
            Duration::from_secs(config.timeout_seconds),
        )
        .map(Some)
    }
}

#[async_trait]
impl IssueTrackerClient for GithubIssueClient {
    #[instrument(skip_all, fields(title = %issue.title))]
    async fn create_issue(&self, issue: &TrackerIssue) -> Result<CreatedIssue, ForwardError> {
        let response = self
            .http
            .post(&self.issues_url)
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .json(issue)
            .send()
            .await?;

        let status = response.status();
        if matches!(status, StatusCode::OK | StatusCode::CREATED) {
            // The status alone means the issue exists; the URL is only for logging.
            Ok(response
                .json::<CreatedIssue>()
                .await
                .unwrap_or(CreatedIssue { html_url: None }))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ForwardError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Opens one tracker issue per critical alert, one request at a time.
pub struct TrackerForwarder {
    client: Arc<dyn IssueTrackerClient>,
}

impl TrackerForwarder {
    pub fn new(client: Arc<dyn IssueTrackerClient>) -> Self {
        Self { client }
    }

    async fn open_issue(&self, alert: &Alert) -> Result<(), ForwardError> {
        let issue = TrackerIssue::from_alert(alert)?;
        let created = self.client.create_issue(&issue).await?;
        info!(
            url = created.html_url.as_deref().unwrap_or("<unknown>"),
            "Created GitHub issue"
        );
        Ok(())
    }
}

#[async_trait]
impl Forwarder for TrackerForwarder {
    fn name(&self) -> &'static str {
        "tracker"
    }

    async fn forward(&self, alerts: &[Alert]) -> ForwardReport {
        let mut report = ForwardReport::new(self.name());
        for alert in alerts.iter().filter(|a| a.is_critical()) {
            report.record(self.open_issue(alert).await);
        }
        debug!(
            attempted = report.attempted,
            delivered = report.delivered,
            "Tracker forwarding finished"
        );
        report
    }
}
