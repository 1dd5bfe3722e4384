//! Order notifier.
//!
//! Turns a submitted order into an operator-facing summary, fans it out to
//! every configured operator and hands back a deep link the storefront can
//! show to the customer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use relay_core::{render_failure_diagnostic, render_order_summary, DeepLinkBuilder};
use relay_models::{ChatId, OperatorId, Order, OrderRef};
use tracing::{info, warn};
use url::Url;

use crate::gateway::{fan_out, FanOutReport, MessagingGateway, SendOptions};

/// Generates order references from the wall clock in milliseconds.
///
/// References keep the timestamp format but never repeat within one
/// generator: two orders in the same millisecond get consecutive values.
#[derive(Debug, Default)]
pub struct OrderRefGenerator {
    last: AtomicU64,
}

impl OrderRefGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next reference, strictly greater than every previous one.
    pub fn next(&self) -> OrderRef {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return OrderRef::from_string(candidate.to_string()),
                Err(actual) => current = actual,
            }
        }
    }
}

/// Result of notifying operators about one order.
#[derive(Debug, Clone)]
pub struct OrderReceipt {
    /// Reference generated for the order.
    pub order_ref: OrderRef,
    /// Link that opens the bot with the order's start payload.
    pub deep_link: Url,
    /// How many operators were reached, and which sends failed.
    pub delivery: FanOutReport,
}

/// Sends order summaries to operators.
pub struct OrderNotifier {
    gateway: Arc<dyn MessagingGateway>,
    operators: Vec<OperatorId>,
    links: DeepLinkBuilder,
    refs: OrderRefGenerator,
    max_concurrent: usize,
}

impl OrderNotifier {
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        operators: Vec<OperatorId>,
        links: DeepLinkBuilder,
        max_concurrent: usize,
    ) -> Self {
        Self {
            gateway,
            operators,
            links,
            refs: OrderRefGenerator::new(),
            max_concurrent,
        }
    }

    fn recipients(&self) -> Vec<ChatId> {
        self.operators.iter().map(|op| op.private_chat()).collect()
    }

    /// Notify every operator about an order.
    ///
    /// Delivery is best-effort: failed sends are logged and reported in the
    /// receipt, never returned as an error.
    pub async fn notify(&self, order: &Order) -> OrderReceipt {
        let order_ref = self.refs.next();
        let deep_link = self.links.for_order(&order_ref);

        if let Some(client_total) = order.total_mismatch() {
            warn!(
                order_ref = %order_ref,
                client_total,
                computed_total = order.grand_total(),
                "Client total disagrees with computed total, using computed"
            );
        }

        let summary = render_order_summary(order, &order_ref, &deep_link);
        let options = SendOptions::html().without_link_preview();
        let delivery = fan_out(
            self.gateway.as_ref(),
            &self.recipients(),
            &summary,
            &options,
            self.max_concurrent,
        )
        .await;

        info!(
            order_ref = %order_ref,
            items = order.items.len(),
            total = order.grand_total(),
            delivered = delivery.delivered,
            failed = delivery.failed.len(),
            "Order forwarded to operators"
        );

        OrderReceipt {
            order_ref,
            deep_link,
            delivery,
        }
    }

    /// Tell operators that an order submission could not be read.
    pub async fn report_failure(&self, reason: &str, raw_payload: &str) -> FanOutReport {
        let text = render_failure_diagnostic(reason, raw_payload);
        fan_out(
            self.gateway.as_ref(),
            &self.recipients(),
            &text,
            &SendOptions::html(),
            self.max_concurrent,
        )
        .await
    }
}
