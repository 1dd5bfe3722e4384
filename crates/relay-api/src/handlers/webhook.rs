//! Bot webhook handler.

use axum::{body::Bytes, extract::State, Json};
use relay_models::{InboundUpdate, RelayUpdate};
use tracing::{debug, error, warn};

use crate::state::AppState;
use crate::types::WebhookAck;

/// POST /api/telegram/webhook - Handle one bot update.
///
/// Always answers 200 so the platform never redelivers; failures are only
/// logged.
pub async fn telegram_webhook(State(state): State<AppState>, body: Bytes) -> Json<WebhookAck> {
    let update = match serde_json::from_slice::<InboundUpdate>(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, "Unreadable webhook update");
            return Json(WebhookAck::default());
        }
    };

    let update_id = update.update_id;
    match state.dispatcher.handle(RelayUpdate::from(update)).await {
        Ok(outcome) => debug!(update_id, ?outcome, "Update handled"),
        Err(e) => error!(update_id, error = %e, "Failed to handle update"),
    }

    Json(WebhookAck::default())
}
