//! Bot lifecycle: identity lookup, webhook registration and the stale
//! session sweeper.

use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::AllowedUpdate;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};
use url::Url;

use crate::dispatcher::RelayDispatcher;
use crate::error::{RelayError, Result};
use crate::gateway::TelegramGateway;

/// How often the sweeper looks for stale sessions.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Administrative handle on the bot account.
#[derive(Clone)]
pub struct RelayBot {
    bot: Bot,
}

impl RelayBot {
    /// Create a handle whose requests are bounded by `timeout`.
    pub fn new(token: &str, timeout: Duration) -> Result<Self> {
        Ok(Self::from_gateway(&TelegramGateway::new(token, timeout)?))
    }

    /// Share the bot of an existing gateway.
    pub fn from_gateway(gateway: &TelegramGateway) -> Self {
        Self {
            bot: gateway.bot().clone(),
        }
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| RelayError::BotStartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Register `url` as the webhook for messages and button presses.
    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        let url = Url::parse(url).map_err(|e| RelayError::WebhookFailed(format!("{}: {}", url, e)))?;
        if url.scheme() != "https" {
            return Err(RelayError::WebhookFailed(format!(
                "{}: webhook URL must use https",
                url
            )));
        }

        self.bot
            .set_webhook(url.clone())
            .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery])
            .await
            .map_err(|e| RelayError::WebhookFailed(e.to_string()))?;
        info!(url = %url, "Webhook registered");
        Ok(())
    }

    /// Remove the registered webhook.
    pub async fn delete_webhook(&self) -> Result<()> {
        self.bot
            .delete_webhook()
            .await
            .map_err(|e| RelayError::WebhookFailed(e.to_string()))?;
        info!("Webhook removed");
        Ok(())
    }
}

/// Prune unclaimed sessions older than `ttl` every `period`.
pub fn spawn_session_sweeper(
    dispatcher: Arc<RelayDispatcher>,
    ttl: chrono::Duration,
    period: Duration,
) -> JoinHandle<()> {
    info!(
        ttl_minutes = ttl.num_minutes(),
        period_secs = period.as_secs(),
        "Starting session sweeper"
    );
    tokio::spawn(async move {
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            match dispatcher.prune_stale(ttl).await {
                Ok(pruned) => debug!(count = pruned.len(), "Session sweep finished"),
                Err(e) => warn!(error = %e, "Session sweep failed"),
            }
        }
    })
}
