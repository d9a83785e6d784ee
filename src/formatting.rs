// src/formatting.rs

use crate::core::{Alert, Clock};
use serde::{Deserialize, Serialize};

/// Longest value Discord accepts for an embed field.
pub const MAX_FIELD_VALUE_CHARS: usize = 1024;

/// Embed colors, picked from the alert's status and severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardColor {
    Green,
    Red,
    Yellow,
    Blue,
}

impl CardColor {
    /// A resolved alert is always green, whatever its severity.
    pub fn for_alert(alert: &Alert) -> Self {
        if alert.is_resolved() {
            return CardColor::Green;
        }
        match alert.severity() {
            Some("critical") => CardColor::Red,
            Some("warning") => CardColor::Yellow,
            _ => CardColor::Blue,
        }
    }

    pub fn value(self) -> u32 {
        match self {
            CardColor::Green => 3_066_993,
            CardColor::Red => 15_158_332,
            CardColor::Yellow => 16_776_960,
            CardColor::Blue => 3_447_003,
        }
    }
}

/// One name/value row of an embed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl CardField {
    fn inline(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline: true,
        }
    }
}

/// A rich chat notification (a Discord embed) built from one alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationCard {
    pub title: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<CardField>,
    pub timestamp: String,
}

impl NotificationCard {
    /// Builds the card for `alert`. The clock supplies the timestamp when
    /// the alert has no `startsAt`.
    pub fn from_alert(alert: &Alert, clock: &dyn Clock) -> Self {
        let severity = alert.non_empty_label("severity").unwrap_or("info");
        let status = alert
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("unknown");
        let instance = alert.non_empty_label("instance").unwrap_or("N/A");

        let mut fields = vec![
            CardField::inline("🔴 Severity", severity.to_uppercase()),
            CardField::inline("📍 Status", status.to_uppercase()),
            CardField::inline("🖥️ Instance", instance),
        ];

        if let Some(description) = alert.non_empty_annotation("description") {
            fields.push(CardField {
                name: "📝 Description".to_string(),
                value: truncate_chars(description, MAX_FIELD_VALUE_CHARS),
                inline: false,
            });
        }

        for (label, name) in [
            ("vlan", "🌐 VLAN"),
            ("location", "📍 Location"),
            ("name", "🐳 Container"),
        ] {
            if let Some(value) = alert.non_empty_label(label) {
                fields.push(CardField::inline(name, value));
            }
        }

        let timestamp = alert
            .starts_at
            .clone()
            .unwrap_or_else(|| clock.now().to_rfc3339());

        Self {
            title: format!("🚨 {}", alert.label("alertname").unwrap_or("Alert")),
            color: CardColor::for_alert(alert).value(),
            description: alert
                .non_empty_annotation("summary")
                .map(|summary| format!("**Summary:** {}", summary)),
            fields,
            timestamp,
        }
    }
}

/// An issue to open in the tracker for a critical alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackerIssue {
    pub title: String,
    pub body: String,
}

impl TrackerIssue {
    /// Title is `[<severity>] <alertname> on <instance>`; the body is the
    /// whole alert as pretty-printed JSON in a fenced code block.
    pub fn from_alert(alert: &Alert) -> Result<Self, serde_json::Error> {
        let title = format!(
            "[{}] {} on {}",
            alert.severity().unwrap_or("none"),
            alert.label("alertname").unwrap_or("Alert"),
            alert.label("instance").unwrap_or(""),
        );
        let body = format!("```json\n{}\n```", serde_json::to_string_pretty(alert)?);
        Ok(Self { title, body })
    }
}

/// Cuts `text` to at most `max` characters, never splitting a character.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
