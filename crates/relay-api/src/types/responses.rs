//! Response DTOs for the API.

use serde::Serialize;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Number of tracked customer sessions.
    pub sessions: usize,
}

/// Order submission response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOrderResponse {
    pub success: bool,
    /// Generated order reference.
    pub order_id: String,
    /// Link that opens the bot chat for this order.
    pub bot_link: String,
}

/// Acknowledgement returned to every webhook delivery.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub ok: bool,
}

impl Default for WebhookAck {
    fn default() -> Self {
        Self { ok: true }
    }
}
