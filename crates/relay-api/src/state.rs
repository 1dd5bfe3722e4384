//! Application state shared across handlers.

use std::sync::Arc;

use relay_core::{ConfigError, DeepLinkBuilder, DeliveryPricing, RelayConfig};
use relay_telegram::{InMemorySessionStore, MessagingGateway, OrderNotifier, RelayDispatcher};

use crate::config::ApiConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// Relay state machine for webhook updates.
    pub dispatcher: Arc<RelayDispatcher>,
    /// Order fan-out to operators.
    pub notifier: Arc<OrderNotifier>,
    /// Delivery price lookup for orders that carry none.
    pub delivery: Arc<DeliveryPricing>,
}

impl AppState {
    /// Creates a new AppState from its parts.
    pub fn new(
        config: ApiConfig,
        dispatcher: RelayDispatcher,
        notifier: OrderNotifier,
        delivery: DeliveryPricing,
    ) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            notifier: Arc::new(notifier),
            delivery: Arc::new(delivery),
        }
    }

    /// Wires the relay around `gateway` with an in-memory session store.
    pub fn build(
        config: ApiConfig,
        relay: &RelayConfig,
        bot_username: &str,
        gateway: Arc<dyn MessagingGateway>,
    ) -> Result<Self, ConfigError> {
        let links = DeepLinkBuilder::new(&relay.deep_link_host, bot_username)?;
        let dispatcher = RelayDispatcher::new(
            Arc::clone(&gateway),
            Arc::new(InMemorySessionStore::new()),
            relay.operator_ids.clone(),
            bot_username,
            relay.max_concurrent_sends,
        );
        let notifier = OrderNotifier::new(
            gateway,
            relay.operator_ids.clone(),
            links,
            relay.max_concurrent_sends,
        );
        Ok(Self::new(config, dispatcher, notifier, relay.delivery.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_models::{CustomerContact, LineItem, OperatorId, Order};
    use relay_telegram::RecordingGateway;

    #[tokio::test]
    async fn test_build_wires_relay() {
        let relay = RelayConfig::new("token").with_operators(vec![OperatorId(1)]);
        let state = AppState::build(
            ApiConfig::default(),
            &relay,
            "ShopBot",
            Arc::new(RecordingGateway::new()),
        )
        .unwrap();

        assert_eq!(state.dispatcher.session_count().await.unwrap(), 0);
        let order = Order {
            items: vec![LineItem::new("A", "", 1, 10.0)],
            customer: CustomerContact::default(),
            delivery_price: 0.0,
            client_total: None,
        };
        let receipt = state.notifier.notify(&order).await;
        assert!(receipt
            .deep_link
            .as_str()
            .starts_with("https://t.me/ShopBot?start=order_"));
        assert_eq!(state.delivery.flat_price, 1200.0);
    }

    #[test]
    fn test_build_rejects_empty_username() {
        let relay = RelayConfig::new("token");
        let result = AppState::build(
            ApiConfig::default(),
            &relay,
            "",
            Arc::new(RecordingGateway::new()),
        );
        assert!(result.is_err());
    }
}
