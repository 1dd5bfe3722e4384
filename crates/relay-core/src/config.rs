//! Shared configuration for the relay.
//!
//! All settings come from the process environment. `.env.local` and `.env`
//! in the working directory are loaded first so a deployment can keep its
//! bot credential out of the shell history.
//!
//! # Environment Variables
//!
//! - `TELEGRAM_BOT_TOKEN`: bot credential (required)
//! - `TELEGRAM_BOT_USERNAME`: username used in deep links
//! - `TELEGRAM_ADMIN_IDS`: comma-separated operator ids
//! - `RELAY_DEEP_LINK_HOST`: messaging host for deep links (default `t.me`)
//! - `RELAY_SEND_TIMEOUT_SECS`: outbound request timeout (default 10)
//! - `RELAY_MAX_CONCURRENT_SENDS`: fan-out concurrency bound (default 8)
//! - `RELAY_SESSION_TTL_HOURS`: expire unclaimed sessions, 0 disables (default 0)
//! - `RELAY_FLAT_DELIVERY_PRICE`: delivery price outside free cities (default 1200)
//! - `RELAY_FREE_DELIVERY_CITIES`: comma-separated city fragments with free delivery
//! - `RELAY_WEBHOOK_URL`: public webhook URL used by `set-webhook`

use std::time::Duration;

use relay_models::OperatorId;
use thiserror::Error;
use tracing::warn;

use crate::delivery::DeliveryPricing;

pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
pub const BOT_USERNAME_ENV: &str = "TELEGRAM_BOT_USERNAME";
pub const OPERATOR_IDS_ENV: &str = "TELEGRAM_ADMIN_IDS";
pub const DEEP_LINK_HOST_ENV: &str = "RELAY_DEEP_LINK_HOST";
pub const SEND_TIMEOUT_ENV: &str = "RELAY_SEND_TIMEOUT_SECS";
pub const MAX_CONCURRENT_SENDS_ENV: &str = "RELAY_MAX_CONCURRENT_SENDS";
pub const SESSION_TTL_ENV: &str = "RELAY_SESSION_TTL_HOURS";
pub const FLAT_DELIVERY_PRICE_ENV: &str = "RELAY_FLAT_DELIVERY_PRICE";
pub const FREE_DELIVERY_CITIES_ENV: &str = "RELAY_FREE_DELIVERY_CITIES";
pub const WEBHOOK_URL_ENV: &str = "RELAY_WEBHOOK_URL";

const DEFAULT_DEEP_LINK_HOST: &str = "t.me";
const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONCURRENT_SENDS: usize = 8;

/// Configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A required variable is not set or empty.
    #[error("{0} not set")]
    Missing(&'static str),

    /// A variable is set but cannot be used.
    #[error("invalid value for {var}: {reason}")]
    Invalid {
        var: &'static str,
        reason: String,
    },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load `.env.local` then `.env` from the working directory, if present.
///
/// Variables already set in the environment are never overwritten.
pub fn load_env_files() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Bot credential.
    pub bot_token: String,
    /// Bot username for deep links, without a leading `@`.
    pub bot_username: Option<String>,
    /// Operators allowed to claim customers, in configured order.
    pub operator_ids: Vec<OperatorId>,
    /// Messaging host used in deep links.
    pub deep_link_host: String,
    /// Timeout for every outbound gateway call.
    pub send_timeout: Duration,
    /// Maximum number of concurrent sends during a fan-out.
    pub max_concurrent_sends: usize,
    /// Unclaimed sessions idle longer than this are pruned.
    pub session_ttl: Option<Duration>,
    /// Delivery price lookup.
    pub delivery: DeliveryPricing,
    /// Public webhook URL.
    pub webhook_url: Option<String>,
}

impl RelayConfig {
    /// Creates a configuration with defaults for everything but the token.
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            bot_username: None,
            operator_ids: Vec::new(),
            deep_link_host: DEFAULT_DEEP_LINK_HOST.to_string(),
            send_timeout: Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS),
            max_concurrent_sends: DEFAULT_MAX_CONCURRENT_SENDS,
            session_ttl: None,
            delivery: DeliveryPricing::default(),
            webhook_url: None,
        }
    }

    /// Sets the bot username.
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(normalize_username(&username.into()));
        self
    }

    /// Sets the operator ids.
    pub fn with_operators(mut self, operators: Vec<OperatorId>) -> Self {
        self.operator_ids = operators;
        self
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get(BOT_TOKEN_ENV).ok_or(ConfigError::Missing(BOT_TOKEN_ENV))?;
        let mut config = Self::new(bot_token);

        config.bot_username = get(BOT_USERNAME_ENV).map(|u| normalize_username(&u));
        config.operator_ids = get(OPERATOR_IDS_ENV)
            .map(|raw| parse_operator_ids(&raw))
            .unwrap_or_default();

        if let Some(host) = get(DEEP_LINK_HOST_ENV) {
            config.deep_link_host = host;
        }
        if let Some(secs) = get(SEND_TIMEOUT_ENV) {
            let secs: u64 = parse_number(SEND_TIMEOUT_ENV, &secs)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    var: SEND_TIMEOUT_ENV,
                    reason: "timeout must be positive".to_string(),
                });
            }
            config.send_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = get(MAX_CONCURRENT_SENDS_ENV) {
            config.max_concurrent_sends = parse_number::<usize>(MAX_CONCURRENT_SENDS_ENV, &max)?.max(1);
        }
        if let Some(hours) = get(SESSION_TTL_ENV) {
            let hours: u64 = parse_number(SESSION_TTL_ENV, &hours)?;
            let secs = hours.checked_mul(3600).ok_or_else(|| ConfigError::Invalid {
                var: SESSION_TTL_ENV,
                reason: format!("{} hours is too long", hours),
            })?;
            config.session_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(price) = get(FLAT_DELIVERY_PRICE_ENV) {
            let price: f64 = parse_number(FLAT_DELIVERY_PRICE_ENV, &price)?;
            if !price.is_finite() || price < 0.0 {
                return Err(ConfigError::Invalid {
                    var: FLAT_DELIVERY_PRICE_ENV,
                    reason: "price must be a non-negative number".to_string(),
                });
            }
            config.delivery.flat_price = price;
        }
        if let Some(cities) = get(FREE_DELIVERY_CITIES_ENV) {
            config.delivery.free_city_fragments = split_list(&cities)
                .map(|c| c.to_lowercase())
                .collect();
        }
        config.webhook_url = get(WEBHOOK_URL_ENV);

        Ok(config)
    }

    /// Returns the bot username or an error naming the variable to set.
    pub fn require_bot_username(&self) -> Result<&str> {
        self.bot_username
            .as_deref()
            .ok_or(ConfigError::Missing(BOT_USERNAME_ENV))
    }
}

/// Parses a comma-separated operator list, skipping invalid entries.
pub fn parse_operator_ids(raw: &str) -> Vec<OperatorId> {
    let mut ids = Vec::new();
    for entry in split_list(raw) {
        match entry.parse::<OperatorId>() {
            Ok(id) if !ids.contains(&id) => ids.push(id),
            Ok(_) => {}
            Err(e) => warn!(entry = %entry, error = %e, "Skipping invalid operator id"),
        }
    }
    ids
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn normalize_username(username: &str) -> String {
    username.trim().trim_start_matches('@').to_string()
}

fn parse_number<T>(var: &'static str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        reason: format!("{:?}: {}", value, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_token() {
        let err = RelayConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(BOT_TOKEN_ENV));
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::from_lookup(lookup(&[(BOT_TOKEN_ENV, "123:abc")])).unwrap();
        assert_eq!(config.bot_token, "123:abc");
        assert!(config.bot_username.is_none());
        assert!(config.operator_ids.is_empty());
        assert_eq!(config.deep_link_host, "t.me");
        assert_eq!(config.send_timeout, Duration::from_secs(10));
        assert_eq!(config.max_concurrent_sends, 8);
        assert!(config.session_ttl.is_none());
        assert_eq!(config.delivery.flat_price, 1200.0);
    }

    #[test]
    fn test_full_environment() {
        let config = RelayConfig::from_lookup(lookup(&[
            (BOT_TOKEN_ENV, "t"),
            (BOT_USERNAME_ENV, "@ShopBot"),
            (OPERATOR_IDS_ENV, "1, 2,,x,2"),
            (SEND_TIMEOUT_ENV, "5"),
            (SESSION_TTL_ENV, "24"),
            (FREE_DELIVERY_CITIES_ENV, "Астан, almaty"),
            (WEBHOOK_URL_ENV, "https://shop.example/api/telegram/webhook"),
        ]))
        .unwrap();

        assert_eq!(config.bot_username.as_deref(), Some("ShopBot"));
        assert_eq!(config.operator_ids, vec![OperatorId(1), OperatorId(2)]);
        assert_eq!(config.send_timeout, Duration::from_secs(5));
        assert_eq!(config.session_ttl, Some(Duration::from_secs(24 * 3600)));
        assert_eq!(config.delivery.free_city_fragments, vec!["астан", "almaty"]);
        assert!(config.webhook_url.is_some());
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = RelayConfig::from_lookup(lookup(&[(BOT_TOKEN_ENV, "t"), (SESSION_TTL_ENV, "0")]))
            .unwrap();
        assert!(config.session_ttl.is_none());
    }

    #[test]
    fn test_ttl_overflow_is_rejected() {
        let err = RelayConfig::from_lookup(lookup(&[
            (BOT_TOKEN_ENV, "t"),
            (SESSION_TTL_ENV, "18446744073709551615"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: SESSION_TTL_ENV, .. }));
    }

    #[test]
    fn test_invalid_numbers() {
        let err = RelayConfig::from_lookup(lookup(&[(BOT_TOKEN_ENV, "t"), (SEND_TIMEOUT_ENV, "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: SEND_TIMEOUT_ENV, .. }));

        let err = RelayConfig::from_lookup(lookup(&[(BOT_TOKEN_ENV, "t"), (SEND_TIMEOUT_ENV, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: SEND_TIMEOUT_ENV, .. }));
    }

    #[test]
    fn test_require_bot_username() {
        let config = RelayConfig::new("t");
        assert_eq!(
            config.require_bot_username().unwrap_err(),
            ConfigError::Missing(BOT_USERNAME_ENV)
        );
        let config = config.with_bot_username("ShopBot");
        assert_eq!(config.require_bot_username().unwrap(), "ShopBot");
    }
}
