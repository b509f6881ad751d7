//! Alert bridge: the well-known alerts channel feeding the notification list
//!
//! A single long-lived subscriber that maps every inbound alert payload to
//! one notification entry. The mapping is pure and has no memory of
//! previously seen alerts, so duplicate delivery of the same alert produces
//! duplicate entries.

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

use crate::channel::{ChannelHandler, ChannelManager, Subscription};
use crate::logger::{self, LogTag};
use crate::notifications::{NotificationEntry, NotificationStore, Severity};

pub const ALERTS_CHANNEL: &str = "alerts";
pub const ALERTS_PATH: &str = "alerts";

/// Inbound alert payload shape
#[derive(Debug, Clone, Deserialize)]
pub struct AlertPayload {
    #[serde(rename = "type")]
    pub alert_type: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(default)]
    pub incident_id: Option<String>,
}

/// CRITICAL and HIGH render as errors, everything else as warnings
pub fn classify(severity: &str) -> Severity {
    match severity {
        "CRITICAL" | "HIGH" => Severity::Error,
        _ => Severity::Warning,
    }
}

/// Map one alert payload to its notification entry, defaulting title and
/// message from the alert type when absent
pub fn entry_for(alert: &AlertPayload) -> NotificationEntry {
    NotificationEntry {
        severity: classify(&alert.severity),
        title: alert
            .title
            .clone()
            .unwrap_or_else(|| format!("Alert: {}", alert.alert_type)),
        message: alert
            .message
            .clone()
            .unwrap_or_else(|| format!("{} alert received", alert.alert_type)),
        observed_at: Utc::now(),
    }
}

/// Long-lived subscriber translating alert payloads into notifications
pub struct AlertBridge {
    subscription: Subscription,
}

impl AlertBridge {
    /// Connect the alerts channel and start appending notifications
    pub fn attach(manager: &ChannelManager, store: Arc<NotificationStore>) -> Self {
        let handler: Arc<dyn ChannelHandler> = Arc::new(move |payload: &serde_json::Value| {
            match serde_json::from_value::<AlertPayload>(payload.clone()) {
                Ok(alert) => store.add_notification(entry_for(&alert)),
                Err(e) => {
                    logger::warning(LogTag::Alerts, &format!("Dropping undecodable alert: {}", e));
                }
            }
        });

        let subscription = manager.attach(ALERTS_CHANNEL, ALERTS_PATH, handler);
        Self { subscription }
    }

    /// Stop consuming alerts; the channel connection stays up for other
    /// subscribers
    pub fn detach(self) {
        self.subscription.unsubscribe();
    }
}
