//! Error types for the relay.

use thiserror::Error;

/// Errors that can occur in the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The messaging API rejected a call or could not be reached.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Failed to start or query the bot.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// Webhook registration failed.
    #[error("Failed to register webhook: {0}")]
    WebhookFailed(String),
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

impl From<teloxide::RequestError> for RelayError {
    fn from(e: teloxide::RequestError) -> Self {
        RelayError::Gateway(e.to_string())
    }
}
