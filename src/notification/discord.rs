//! A client for sending alert notifications to a Discord webhook.

use crate::config::ChatConfig;
use crate::core::{Alert, Clock};
use crate::formatting::NotificationCard;
use crate::notification::{ForwardError, ForwardReport, Forwarder};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Discord accepts at most this many embeds per message.
pub const MAX_EMBEDS_PER_MESSAGE: usize = 10;

/// The JSON body posted to the webhook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookMessage {
    pub username: String,
    pub embeds: Vec<NotificationCard>,
}

/// A trait for clients that can deliver webhook messages.
#[async_trait]
pub trait ChatWebhookClient: Send + Sync {
    async fn send_message(&self, message: &WebhookMessage) -> Result<(), ForwardError>;
}

/// A client for a single Discord incoming webhook URL.
pub struct DiscordWebhookClient {
    http: reqwest::Client,
    webhook_url: String,
}

impl DiscordWebhookClient {
    pub fn new(webhook_url: String, timeout: Duration) -> Result<Self, ForwardError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, webhook_url })
    }

    /// Builds a client from the chat configuration. Returns `Ok(None)` when
    /// no webhook URL is configured.
    pub fn from_config(config: &ChatConfig) -> Result<Option<Self>, ForwardError> {
        match config.webhook_url() {
            Some(url) => Self::new(url.to_string(), Duration::from_secs(config.timeout_seconds)).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ChatWebhookClient for DiscordWebhookClient {
    #[instrument(skip_all, fields(count = message.embeds.len()))]
    async fn send_message(&self, message: &WebhookMessage) -> Result<(), ForwardError> {
        let response = self.http.post(&self.webhook_url).json(message).send().await?;

        let status = response.status();
        if matches!(status, StatusCode::OK | StatusCode::NO_CONTENT) {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ForwardError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Turns every alert into a card and posts the cards in batches.
pub struct ChatNotifier {
    client: Arc<dyn ChatWebhookClient>,
    username: String,
    clock: Arc<dyn Clock>,
}

impl ChatNotifier {
    pub fn new(client: Arc<dyn ChatWebhookClient>, username: String, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            username,
            clock,
        }
    }

    /// Groups the alerts' cards into webhook messages of at most
    /// [`MAX_EMBEDS_PER_MESSAGE`] embeds each.
    pub fn build_messages(&self, alerts: &[Alert]) -> Vec<WebhookMessage> {
        let cards: Vec<NotificationCard> = alerts
            .iter()
            .map(|alert| NotificationCard::from_alert(alert, self.clock.as_ref()))
            .collect();

        cards
            .chunks(MAX_EMBEDS_PER_MESSAGE)
            .map(|batch| WebhookMessage {
                username: self.username.clone(),
                embeds: batch.to_vec(),
            })
            .collect()
    }
}

#[async_trait]
impl Forwarder for ChatNotifier {
    fn name(&self) -> &'static str {
        "chat"
    }

    async fn forward(&self, alerts: &[Alert]) -> ForwardReport {
        let mut report = ForwardReport::new(self.name());
        for message in self.build_messages(alerts) {
            let result = self.client.send_message(&message).await;
            if result.is_ok() {
                info!("Sent {} alerts to Discord webhook", message.embeds.len());
            }
            report.record(result);
        }
        report
    }
}
