//! End-to-end relay scenarios against a recording gateway.

use std::sync::Arc;

use relay_models::{ChatId, CustomerId, InboundUpdate, OperatorId, RelayUpdate, SessionStatus};
use relay_telegram::cards;
use relay_telegram::{
    DispatchOutcome, InMemorySessionStore, RecordingGateway, RelayDispatcher, SessionStore,
};

const OPERATOR_A: i64 = 1001;
const OPERATOR_B: i64 = 1002;

struct Harness {
    gateway: Arc<RecordingGateway>,
    store: Arc<InMemorySessionStore>,
    dispatcher: Arc<RelayDispatcher>,
}

impl Harness {
    fn new() -> Self {
        let gateway = Arc::new(RecordingGateway::new());
        let store = Arc::new(InMemorySessionStore::new());
        let dispatcher = Arc::new(RelayDispatcher::new(
            gateway.clone(),
            store.clone(),
            vec![OperatorId(OPERATOR_A), OperatorId(OPERATOR_B)],
            "ShopBot",
            4,
        ));
        Self {
            gateway,
            store,
            dispatcher,
        }
    }

    async fn text(&self, sender: i64, text: &str) -> DispatchOutcome {
        self.dispatcher
            .handle(RelayUpdate::Message {
                sender,
                chat_id: ChatId(sender),
                text: text.to_string(),
            })
            .await
            .unwrap()
    }

    async fn press(&self, sender: i64, data: &str) -> DispatchOutcome {
        self.dispatcher
            .handle(RelayUpdate::Callback {
                callback_id: format!("cb-{}", sender),
                sender,
                data: data.to_string(),
            })
            .await
            .unwrap()
    }

    fn count_to(&self, chat: i64, text: &str) -> usize {
        self.gateway
            .messages_to(ChatId(chat))
            .iter()
            .filter(|m| m.text == text)
            .count()
    }
}

#[tokio::test]
async fn test_order_link_greets_once_and_introduces_once() {
    let h = Harness::new();

    h.text(42, "/start order_777").await;
    h.text(42, "first question").await;
    h.text(42, "second question").await;

    let session = h.store.get(CustomerId(42)).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::AwaitingOperator);
    assert_eq!(session.order_ref.as_ref().unwrap().as_str(), "777");

    assert_eq!(h.count_to(42, cards::ORDER_WELCOME), 1);
    assert_eq!(h.count_to(42, cards::AWAITING_ACK), 0);

    for operator in [OPERATOR_A, OPERATOR_B] {
        let cards_received = h
            .gateway
            .messages_to(ChatId(operator))
            .into_iter()
            .filter(|m| m.text.contains("New customer in the bot"))
            .count();
        assert_eq!(cards_received, 1);
    }
}

#[tokio::test]
async fn test_repeated_start_does_not_renotify() {
    let h = Harness::new();
    h.text(42, "/start order_777").await;
    h.text(42, "/start order_777").await;

    assert_eq!(h.gateway.messages_to(ChatId(OPERATOR_A)).len(), 1);
    assert_eq!(h.count_to(42, cards::ORDER_WELCOME), 1);
}

#[tokio::test]
async fn test_acknowledgement_sent_once_without_order() {
    let h = Harness::new();
    for text in ["hello", "anyone?", "still here"] {
        h.text(42, text).await;
    }

    assert_eq!(h.count_to(42, cards::AWAITING_ACK), 1);
    // Every message still reaches every operator until one claims it.
    assert_eq!(h.gateway.messages_to(ChatId(OPERATOR_A)).len(), 3);
    assert_eq!(h.gateway.messages_to(ChatId(OPERATOR_B)).len(), 3);

    let card = &h.gateway.messages_to(ChatId(OPERATOR_A))[0];
    let keyboard = card.options.keyboard.as_ref().unwrap();
    assert_eq!(keyboard.rows[0][0].data, "connect:42");
}

#[tokio::test]
async fn test_concurrent_messages_acknowledge_once() {
    let h = Harness::new();
    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let dispatcher = Arc::clone(&h.dispatcher);
            tokio::spawn(async move {
                dispatcher
                    .handle(RelayUpdate::Message {
                        sender: 42,
                        chat_id: ChatId(42),
                        text: format!("message {}", i),
                    })
                    .await
                    .unwrap()
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(h.count_to(42, cards::AWAITING_ACK), 1);
    assert_eq!(h.gateway.messages_to(ChatId(OPERATOR_A)).len(), 16);
}

#[tokio::test]
async fn test_connected_customer_reaches_only_bound_operator() {
    let h = Harness::new();
    h.text(42, "/start order_777").await;

    let outcome = h.press(OPERATOR_A, "connect:42").await;
    assert_eq!(
        outcome,
        DispatchOutcome::Connected {
            operator: OperatorId(OPERATOR_A),
            customer: CustomerId(42),
            previous: None,
        }
    );
    assert_eq!(h.count_to(42, cards::OPERATOR_JOINED), 1);
    h.gateway.clear();

    let outcome = h.text(42, "where is my parcel?").await;
    assert_eq!(
        outcome,
        DispatchOutcome::ForwardedToOperator {
            customer: CustomerId(42),
            operator: OperatorId(OPERATOR_A),
        }
    );
    assert_eq!(h.gateway.messages_to(ChatId(OPERATOR_A)).len(), 1);
    assert!(h.gateway.messages_to(ChatId(OPERATOR_B)).is_empty());

    h.text(OPERATOR_A, "It ships tomorrow").await;
    assert_eq!(h.count_to(42, "It ships tomorrow"), 1);
}

#[tokio::test]
async fn test_rebind_moves_customer_to_second_operator() {
    let h = Harness::new();
    h.text(42, "/start order_777").await;
    h.press(OPERATOR_A, "connect:42").await;

    let outcome = h.press(OPERATOR_B, "connect:42").await;
    assert_eq!(
        outcome,
        DispatchOutcome::Connected {
            operator: OperatorId(OPERATOR_B),
            customer: CustomerId(42),
            previous: Some(OperatorId(OPERATOR_A)),
        }
    );
    assert!(h
        .gateway
        .messages_to(ChatId(OPERATOR_A))
        .iter()
        .any(|m| m.text.contains("taken over")));
    h.gateway.clear();

    h.text(42, "hello again").await;
    assert_eq!(h.gateway.messages_to(ChatId(OPERATOR_B)).len(), 1);
    assert!(h.gateway.messages_to(ChatId(OPERATOR_A)).is_empty());

    // The replaced operator is no longer bound to anyone.
    let outcome = h.text(OPERATOR_A, "are you there?").await;
    assert_eq!(outcome, DispatchOutcome::OperatorUnbound(OperatorId(OPERATOR_A)));
    assert_eq!(h.count_to(42, "are you there?"), 0);
}

#[tokio::test]
async fn test_unbound_operator_message_reaches_no_customer() {
    let h = Harness::new();
    h.text(42, "hi").await;
    h.text(43, "/start order_5").await;
    h.gateway.clear();

    let outcome = h.text(OPERATOR_A, "hello everyone").await;
    assert_eq!(outcome, DispatchOutcome::OperatorUnbound(OperatorId(OPERATOR_A)));
    assert!(h.gateway.messages_to(ChatId(42)).is_empty());
    assert!(h.gateway.messages_to(ChatId(43)).is_empty());

    let warning = &h.gateway.messages_to(ChatId(OPERATOR_A))[0];
    assert_eq!(warning.options.keyboard.as_ref().unwrap().rows.len(), 2);
}

#[tokio::test]
async fn test_connect_unknown_customer() {
    let h = Harness::new();
    let outcome = h.press(OPERATOR_A, "connect:999").await;
    assert_eq!(outcome, DispatchOutcome::CustomerNotFound(CustomerId(999)));

    let answers = h.gateway.callback_answers();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].text.as_deref(), Some(cards::CALLBACK_NOT_FOUND));
    assert!(h.store.get(CustomerId(999)).await.unwrap().is_none());
    assert!(h.gateway.messages().is_empty());
}

#[tokio::test]
async fn test_raw_webhook_updates() {
    let h = Harness::new();

    let start: InboundUpdate = serde_json::from_str(
        r#"{"update_id":1,"message":{"message_id":1,"from":{"id":42,"is_bot":false,"first_name":"A"},
            "chat":{"id":42,"type":"private"},"date":0,"text":"/start order_777"}}"#,
    )
    .unwrap();
    h.dispatcher.handle(start.into()).await.unwrap();

    let press: InboundUpdate = serde_json::from_str(
        r#"{"update_id":2,"callback_query":{"id":"abc","from":{"id":1001,"is_bot":false,"first_name":"Op"},
            "chat_instance":"x","data":"connect:42"}}"#,
    )
    .unwrap();
    h.dispatcher.handle(press.into()).await.unwrap();

    let session = h.store.get(CustomerId(42)).await.unwrap().unwrap();
    assert_eq!(session.bound_operator(), Some(OperatorId(OPERATOR_A)));
    assert_eq!(h.gateway.callback_answers()[0].callback_id, "abc");
}
