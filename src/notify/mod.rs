//! Run notifications
//!
//! Notifications are best-effort: a failed delivery is logged and never
//! changes the outcome of the run that triggered it.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use crate::config::settings::TelegramSettings;
use crate::error::{BackupError, BackupResult};

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Delivers a short text message
pub trait Notifier {
    /// Send `text`
    fn send(&self, text: &str) -> BackupResult<()>;
}

/// Notifier that discards every message
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn send(&self, _text: &str) -> BackupResult<()> {
        Ok(())
    }
}

/// Telegram Bot API notifier
pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    base_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a notifier posting to `chat_id` as the given bot
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> BackupResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BackupError::Notify(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: TELEGRAM_API.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        })
    }

    /// Point at a different Bot API server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.base_url.trim_end_matches('/'),
            self.bot_token
        )
    }
}

impl Notifier for TelegramNotifier {
    fn send(&self, text: &str) -> BackupResult<()> {
        let body = json!({
            "chat_id": self.chat_id,
            "text": text,
        });

        // The URL carries the bot token, keep it out of error messages
        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .map_err(|e| BackupError::Notify(format!("Failed to send message: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackupError::Notify(format!(
                "Telegram API returned status {}",
                status
            )));
        }

        debug!("Notification delivered");
        Ok(())
    }
}

/// Build the notifier described by the settings
///
/// A disabled or incomplete configuration yields a [`NullNotifier`].
pub fn from_settings(settings: &TelegramSettings) -> BackupResult<Box<dyn Notifier>> {
    if !settings.enabled || settings.bot_token.is_empty() || settings.chat_id.is_empty() {
        return Ok(Box::new(NullNotifier));
    }
    Ok(Box::new(TelegramNotifier::new(
        settings.bot_token.clone(),
        settings.chat_id.clone(),
    )?))
}

/// Send `text`, logging instead of returning a failure
pub fn notify(notifier: &dyn Notifier, text: &str) {
    if let Err(e) = notifier.send(text) {
        warn!("Failed to send notification: {}", e);
    }
}
