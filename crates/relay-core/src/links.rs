//! Deep links back to the bot.

use relay_models::OrderRef;
use url::Url;

use crate::config::{ConfigError, Result, BOT_USERNAME_ENV, DEEP_LINK_HOST_ENV};

/// Builds `https://<host>/<bot>?start=order_<ref>` links.
#[derive(Debug, Clone)]
pub struct DeepLinkBuilder {
    base: Url,
}

impl DeepLinkBuilder {
    /// Creates a builder for the given messaging host and bot username.
    pub fn new(host: &str, bot_username: &str) -> Result<Self> {
        let username = bot_username.trim().trim_start_matches('@');
        if username.is_empty() {
            return Err(ConfigError::Missing(BOT_USERNAME_ENV));
        }
        let base = Url::parse(&format!("https://{}/{}", host.trim().trim_end_matches('/'), username))
            .map_err(|e| ConfigError::Invalid {
                var: DEEP_LINK_HOST_ENV,
                reason: e.to_string(),
            })?;
        Ok(Self { base })
    }

    /// Link that opens the bot chat with the order's start payload.
    pub fn for_order(&self, order_ref: &OrderRef) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("start", &order_ref.start_payload());
        url
    }
}
