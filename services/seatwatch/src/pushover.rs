//! Pushover alert sink

use std::sync::Arc;

use async_trait::async_trait;

use crate::alert::{Alert, AlertSink};
use crate::config::AlertSinkConfig;
use crate::io::HttpClient;

const PUSHOVER_API_URL: &str = "https://api.pushover.net/1/messages.json";

/// Sends each alert as a Pushover message
pub struct PushoverSink {
    api_token: String,
    user_key: String,
    title: String,
    priority: i8,
    sound: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for PushoverSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushoverSink")
            .field("title", &self.title)
            .finish()
    }
}

impl PushoverSink {
    /// Build from a `pushover` sink config entry
    pub fn from_config(config: &AlertSinkConfig, http: Arc<dyn HttpClient>) -> Option<Self> {
        let AlertSinkConfig::Pushover {
            api_token,
            user_key,
            title,
            priority,
            sound,
        } = config
        else {
            return None;
        };

        tracing::debug!("Created PushoverSink with title '{}'", title);

        Some(Self {
            api_token: api_token.clone(),
            user_key: user_key.clone(),
            title: title.clone(),
            priority: *priority,
            sound: sound.clone(),
            http,
        })
    }
}

#[async_trait]
impl AlertSink for PushoverSink {
    fn type_name(&self) -> &str {
        "pushover"
    }

    async fn alert(&self, alert: &Alert) -> crate::Result<()> {
        let priority = self.priority.to_string();
        let params = [
            ("token", self.api_token.as_str()),
            ("user", self.user_key.as_str()),
            ("title", self.title.as_str()),
            ("message", alert.message.as_str()),
            ("priority", priority.as_str()),
            ("sound", self.sound.as_str()),
        ];

        tracing::debug!("Sending Pushover alert for class {}", alert.target);

        let response = self.http.post_form(PUSHOVER_API_URL, "", &params).await?;
        if response.status != 200 {
            return Err(crate::SeatWatchError::Alert(format!(
                "Pushover API returned status {}: {}",
                response.status, response.body
            )));
        }

        tracing::debug!("Pushover alert sent");
        Ok(())
    }
}
