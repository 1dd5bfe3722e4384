//! Order submission handler.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::{SendOrderRequest, SendOrderResponse};

/// POST /api/telegram/send-order - Forward an order to the operators.
///
/// Malformed submissions are answered with 400 and reported to operators
/// as a diagnostic.
pub async fn send_order(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SendOrderResponse>)> {
    let order = match parse_order(&state, &body) {
        Ok(order) => order,
        Err(e) => {
            warn!(error = %e, "Rejected order submission");
            let raw = String::from_utf8_lossy(&body);
            let report = state.notifier.report_failure(&e.to_string(), &raw).await;
            if !report.failed.is_empty() {
                warn!(failed = report.failed.len(), "Failure diagnostic not delivered to every operator");
            }
            return Err(e);
        }
    };

    let receipt = state.notifier.notify(&order).await;
    info!(
        order_ref = %receipt.order_ref,
        delivered = receipt.delivery.delivered,
        "Order submission accepted"
    );

    Ok((
        StatusCode::CREATED,
        Json(SendOrderResponse {
            success: true,
            order_id: receipt.order_ref.to_string(),
            bot_link: receipt.deep_link.to_string(),
        }),
    ))
}

fn parse_order(state: &AppState, body: &[u8]) -> Result<relay_models::Order> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON: {}", e)))?;
    SendOrderRequest::from_json(value)?.into_order(&state.delivery)
}
