//! Relay dispatcher.
//!
//! Classifies each inbound update, mutates the customer's session and
//! forwards text to the right counterpart. Every read-modify-write on a
//! session runs under that customer's [`KeyedLocks`] guard, and the guard is
//! held until the resulting sends complete, so rapid updates from one
//! customer are applied in order.

use std::sync::Arc;

use chrono::Duration;
use futures::stream::{self, StreamExt};
use relay_models::{
    CallbackAction, ChatId, CustomerId, OperatorId, OrderRef, RelayUpdate, Session, SessionStatus,
};
use tracing::{debug, info, warn};

use crate::cards;
use crate::commands::{OperatorCommand, StartCommand};
use crate::error::Result;
use crate::gateway::{fan_out, MessagingGateway, SendOptions};
use crate::store::{prune_stale, KeyedLocks, SessionStore};

/// What the dispatcher did with an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// An operator claimed a customer.
    Connected {
        operator: OperatorId,
        customer: CustomerId,
        previous: Option<OperatorId>,
    },
    /// A connect press named a customer without a session.
    CustomerNotFound(CustomerId),
    /// A button press the relay does not act on.
    CallbackIgnored,
    /// A customer opened the bot through a `/start` link.
    SessionStarted {
        customer: CustomerId,
        order_ref: Option<OrderRef>,
        created: bool,
    },
    /// An operator's text was relayed to their customers.
    ForwardedToCustomers {
        operator: OperatorId,
        customers: Vec<CustomerId>,
    },
    /// An operator wrote without a bound customer.
    OperatorUnbound(OperatorId),
    /// An operator command was answered.
    CommandAnswered(OperatorCommand),
    /// An unclaimed customer's text was broadcast to operators.
    Broadcast {
        customer: CustomerId,
        acknowledged: bool,
    },
    /// A connected customer's text was relayed to their operator.
    ForwardedToOperator {
        customer: CustomerId,
        operator: OperatorId,
    },
    /// The update was acknowledged without further action.
    Ignored(&'static str),
}

/// The operator relay state machine.
pub struct RelayDispatcher {
    gateway: Arc<dyn MessagingGateway>,
    store: Arc<dyn SessionStore>,
    locks: KeyedLocks,
    operators: Vec<OperatorId>,
    bot_username: String,
    max_concurrent: usize,
}

impl RelayDispatcher {
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        store: Arc<dyn SessionStore>,
        operators: Vec<OperatorId>,
        bot_username: impl Into<String>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            gateway,
            store,
            locks: KeyedLocks::new(),
            operators,
            bot_username: bot_username.into(),
            max_concurrent,
        }
    }

    /// Handle one inbound update.
    ///
    /// Gateway failures are logged and never returned; only session store
    /// failures surface as errors.
    pub async fn handle(&self, update: RelayUpdate) -> Result<DispatchOutcome> {
        match update {
            RelayUpdate::Callback {
                callback_id,
                sender,
                data,
            } => self.handle_callback(&callback_id, sender, &data).await,
            RelayUpdate::Message {
                sender,
                chat_id,
                text,
            } => self.handle_message(sender, chat_id, &text).await,
            RelayUpdate::Unsupported { reason } => {
                debug!(reason, "Ignoring update");
                Ok(DispatchOutcome::Ignored(reason))
            }
        }
    }

    /// Number of tracked sessions.
    pub async fn session_count(&self) -> Result<usize> {
        Ok(self.store.list().await?.len())
    }

    /// Snapshot of all sessions.
    pub async fn sessions(&self) -> Result<Vec<Session>> {
        self.store.list().await
    }

    /// Remove unclaimed sessions idle for longer than `ttl`.
    pub async fn prune_stale(&self, ttl: Duration) -> Result<Vec<CustomerId>> {
        prune_stale(self.store.as_ref(), &self.locks, ttl).await
    }

    fn operator(&self, sender: i64) -> Option<OperatorId> {
        let id = OperatorId(sender);
        self.operators.contains(&id).then_some(id)
    }

    fn operator_chats(&self) -> Vec<ChatId> {
        self.operators.iter().map(|op| op.private_chat()).collect()
    }

    async fn send(&self, chat: ChatId, text: &str, options: &SendOptions) {
        if let Err(e) = self.gateway.send_message(chat, text, options).await {
            warn!(chat_id = %chat, error = %e, "Failed to send message");
        }
    }

    async fn answer(&self, callback_id: &str, text: &str) {
        if let Err(e) = self.gateway.answer_callback(callback_id, Some(text)).await {
            warn!(callback_id, error = %e, "Failed to answer callback");
        }
    }

    async fn broadcast(&self, text: &str, options: &SendOptions) {
        let report = fan_out(
            self.gateway.as_ref(),
            &self.operator_chats(),
            text,
            options,
            self.max_concurrent,
        )
        .await;
        debug!(
            delivered = report.delivered,
            failed = report.failed.len(),
            "Broadcast to operators"
        );
    }

    async fn handle_callback(
        &self,
        callback_id: &str,
        sender: i64,
        data: &str,
    ) -> Result<DispatchOutcome> {
        let (operator, customer) = match (self.operator(sender), CallbackAction::parse(data)) {
            (Some(operator), Some(CallbackAction::Connect(customer))) => (operator, customer),
            _ => {
                debug!(sender, data, "Ignoring callback");
                self.answer(callback_id, cards::CALLBACK_NOOP).await;
                return Ok(DispatchOutcome::CallbackIgnored);
            }
        };

        let _guard = self.locks.lock(customer).await;
        let Some(mut session) = self.store.get(customer).await? else {
            info!(operator_id = %operator, customer_id = %customer, "Connect for unknown customer");
            self.answer(callback_id, cards::CALLBACK_NOT_FOUND).await;
            return Ok(DispatchOutcome::CustomerNotFound(customer));
        };

        let previous = session.bind(operator);
        let customer_chat = session.chat_id;
        self.store.upsert(session).await?;
        info!(
            operator_id = %operator,
            customer_id = %customer,
            previous = ?previous,
            "Operator connected"
        );

        self.answer(callback_id, cards::CALLBACK_CONNECTED).await;
        self.send(
            operator.private_chat(),
            &cards::operator_connected(customer),
            &SendOptions::html(),
        )
        .await;

        if previous != Some(operator) {
            self.send(customer_chat, cards::OPERATOR_JOINED, &SendOptions::plain())
                .await;
        }
        if let Some(replaced) = previous.filter(|p| *p != operator) {
            self.send(
                replaced.private_chat(),
                &cards::operator_replaced(customer),
                &SendOptions::html(),
            )
            .await;
        }

        Ok(DispatchOutcome::Connected {
            operator,
            customer,
            previous,
        })
    }

    async fn handle_message(&self, sender: i64, chat: ChatId, text: &str) -> Result<DispatchOutcome> {
        let operator = self.operator(sender);

        match (StartCommand::parse(text, &self.bot_username), operator) {
            (Some(StartCommand::Order(order_ref)), _) => {
                return self.start_with_order(CustomerId(sender), chat, order_ref).await;
            }
            (Some(_), Some(operator)) => {
                return self.answer_command(operator, OperatorCommand::Help).await;
            }
            (Some(_), None) => return self.start_bare(CustomerId(sender), chat).await,
            (None, _) => {}
        }

        match operator {
            Some(operator) => self.operator_message(operator, text).await,
            None => self.customer_message(CustomerId(sender), chat, text).await,
        }
    }

    async fn start_with_order(
        &self,
        customer: CustomerId,
        chat: ChatId,
        order_ref: OrderRef,
    ) -> Result<DispatchOutcome> {
        let _guard = self.locks.lock(customer).await;
        let existing = self.store.get(customer).await?;
        let created = existing.is_none();

        // A customer who only said a bare /start has not been introduced yet.
        let introduce = existing.as_ref().map_or(true, |s| s.status == SessionStatus::New);
        let mut session = match existing {
            Some(mut session) => {
                session.chat_id = chat;
                session.attach_order(order_ref.clone());
                session
            }
            None => Session::for_order(customer, chat, order_ref.clone()),
        };
        let welcome = session.mark_welcome_sent();
        self.store.upsert(session).await?;

        info!(
            customer_id = %customer,
            order_ref = %order_ref,
            created,
            "Customer opened order link"
        );

        if welcome {
            self.send(chat, cards::ORDER_WELCOME, &SendOptions::plain()).await;
        }
        if introduce {
            let options = SendOptions::html().with_keyboard(cards::connect_keyboard(customer));
            self.broadcast(&cards::new_customer_card(customer, &order_ref), &options)
                .await;
        }

        Ok(DispatchOutcome::SessionStarted {
            customer,
            order_ref: Some(order_ref),
            created,
        })
    }

    async fn start_bare(&self, customer: CustomerId, chat: ChatId) -> Result<DispatchOutcome> {
        let _guard = self.locks.lock(customer).await;
        let created = self.store.get(customer).await?.is_none();
        if created {
            self.store.upsert(Session::new(customer, chat)).await?;
            info!(customer_id = %customer, "Customer opened the bot");
            self.send(chat, cards::BARE_START_GREETING, &SendOptions::plain())
                .await;
        }

        Ok(DispatchOutcome::SessionStarted {
            customer,
            order_ref: None,
            created,
        })
    }

    async fn answer_command(
        &self,
        operator: OperatorId,
        command: OperatorCommand,
    ) -> Result<DispatchOutcome> {
        match command {
            OperatorCommand::Help => {
                self.send(
                    operator.private_chat(),
                    &OperatorCommand::help_text(),
                    &SendOptions::plain(),
                )
                .await;
            }
            OperatorCommand::Sessions => {
                let sessions = self.store.list().await?;
                self.send(
                    operator.private_chat(),
                    &cards::session_listing(&sessions),
                    &SendOptions::html(),
                )
                .await;
            }
        }
        Ok(DispatchOutcome::CommandAnswered(command))
    }

    async fn operator_message(&self, operator: OperatorId, text: &str) -> Result<DispatchOutcome> {
        if let Some(command) = OperatorCommand::parse_text(text, &self.bot_username) {
            return self.answer_command(operator, command).await;
        }

        let sessions = self.store.list().await?;
        let bound: Vec<&Session> = sessions
            .iter()
            .filter(|s| s.bound_operator() == Some(operator))
            .collect();

        if bound.is_empty() {
            info!(operator_id = %operator, "Operator wrote without a bound customer");
            let keyboard = cards::awaiting_keyboard(&sessions);
            let mut options = SendOptions::plain();
            if !keyboard.is_empty() {
                options = options.with_keyboard(keyboard.clone());
            }
            self.send(
                operator.private_chat(),
                &cards::unbound_warning(!keyboard.is_empty()),
                &options,
            )
            .await;
            return Ok(DispatchOutcome::OperatorUnbound(operator));
        }

        // The listing is a snapshot; each binding is checked again under its lock.
        let candidates: Vec<CustomerId> = bound.iter().map(|s| s.customer_id).collect();
        let results: Vec<Result<Option<CustomerId>>> = stream::iter(candidates)
            .map(|customer| self.forward_to_customer(operator, customer, text))
            .buffer_unordered(self.max_concurrent.max(1))
            .collect()
            .await;

        let mut customers = Vec::new();
        for result in results {
            customers.extend(result?);
        }
        customers.sort();
        debug!(
            operator_id = %operator,
            customers = customers.len(),
            "Relayed operator message"
        );

        Ok(DispatchOutcome::ForwardedToCustomers {
            operator,
            customers,
        })
    }

    /// Relay operator text to one customer if the binding still holds.
    async fn forward_to_customer(
        &self,
        operator: OperatorId,
        customer: CustomerId,
        text: &str,
    ) -> Result<Option<CustomerId>> {
        let _guard = self.locks.lock(customer).await;
        match self.store.get(customer).await? {
            Some(session) if session.bound_operator() == Some(operator) => {
                self.send(session.chat_id, text, &SendOptions::plain()).await;
                Ok(Some(customer))
            }
            _ => {
                debug!(operator_id = %operator, customer_id = %customer, "Binding changed before relay");
                Ok(None)
            }
        }
    }

    async fn customer_message(
        &self,
        customer: CustomerId,
        chat: ChatId,
        text: &str,
    ) -> Result<DispatchOutcome> {
        let _guard = self.locks.lock(customer).await;
        let mut session = self
            .store
            .get(customer)
            .await?
            .unwrap_or_else(|| Session::new(customer, chat));
        session.chat_id = chat;

        if let Some(operator) = session.bound_operator() {
            session.touch();
            self.store.upsert(session).await?;
            self.send(
                operator.private_chat(),
                &cards::forwarded_from_customer(customer, text),
                &SendOptions::html(),
            )
            .await;
            return Ok(DispatchOutcome::ForwardedToOperator { customer, operator });
        }

        session.mark_awaiting();
        let acknowledged = session.mark_welcome_sent();
        self.store.upsert(session).await?;

        if acknowledged {
            self.send(chat, cards::AWAITING_ACK, &SendOptions::plain()).await;
        }
        let options = SendOptions::html().with_keyboard(cards::connect_keyboard(customer));
        self.broadcast(&cards::customer_message_card(customer, text), &options)
            .await;

        Ok(DispatchOutcome::Broadcast {
            customer,
            acknowledged,
        })
    }
}
