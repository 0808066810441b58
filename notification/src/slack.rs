//! Incoming-webhook delivery
//!
//! The webhook URL is never written into config files; config only names
//! the environment variable that holds it. A missing URL downgrades every
//! send to a logged skip so a dry run needs no Slack workspace.

use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use tracing::{error, info};

use common::SlackConfig;

use crate::message::{Block, SlackMessage};

pub struct WebhookSender {
    http: Client,
    webhook_url: Option<String>,
    greeting: String,
}

impl WebhookSender {
    pub fn from_config(config: &SlackConfig) -> Result<Self> {
        let webhook_url = match std::env::var(&config.webhook_url_env) {
            Ok(url) if !url.trim().is_empty() => Some(url),
            _ => {
                error!(
                    "Slack webhook URL is not set in {}; delivery will be skipped",
                    config.webhook_url_env
                );
                None
            }
        };
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            webhook_url,
            greeting: config.greeting.clone(),
        })
    }

    /// Insert the configured greeting section at the top of a message.
    pub fn add_greeting(&self, message: &mut SlackMessage) {
        message
            .blocks
            .insert(0, Block::section(self.greeting.clone()));
    }

    /// Post one message. `Ok(false)` reports a skipped delivery (no webhook
    /// URL configured); HTTP failures surface as errors.
    pub async fn send(&self, message: &SlackMessage) -> Result<bool> {
        let Some(url) = &self.webhook_url else {
            return Ok(false);
        };

        let response = self.http.post(url).json(message).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Slack webhook error: HTTP {status} {body}"));
        }
        info!("Posted to Slack (HTTP {status})");
        Ok(true)
    }
}
