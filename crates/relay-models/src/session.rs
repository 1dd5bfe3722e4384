//! Customer session types.
//!
//! A session is one customer's conversational state with the operator desk.
//! The bound operator lives inside [`SessionStatus::Connected`], so a session
//! carries an operator if and only if it is connected.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChatId, CustomerId, OperatorId, OrderRef};

/// Status of a customer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    /// Customer made contact without an order and has not written yet.
    #[default]
    New,
    /// Customer is waiting for an operator to claim the conversation.
    AwaitingOperator,
    /// Customer is bound to a specific operator.
    Connected {
        /// The operator currently handling this customer.
        operator: OperatorId,
    },
}

impl SessionStatus {
    /// Short label used in operator listings.
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::New => "new",
            SessionStatus::AwaitingOperator => "awaiting operator",
            SessionStatus::Connected { .. } => "connected",
        }
    }
}

/// One customer's conversational state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Messaging-platform identifier of the customer.
    pub customer_id: CustomerId,
    /// Chat the customer is reached at.
    pub chat_id: ChatId,
    /// Order that originated this session, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_ref: Option<OrderRef>,
    /// Current status.
    #[serde(flatten)]
    pub status: SessionStatus,
    /// Whether the one-time acknowledgement has been delivered.
    #[serde(default)]
    pub welcome_sent: bool,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session for a customer who made contact without an order.
    pub fn new(customer_id: CustomerId, chat_id: ChatId) -> Self {
        let now = Utc::now();
        Self {
            customer_id,
            chat_id,
            order_ref: None,
            status: SessionStatus::New,
            welcome_sent: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a session for a customer arriving through an order deep link.
    pub fn for_order(customer_id: CustomerId, chat_id: ChatId, order_ref: OrderRef) -> Self {
        let mut session = Self::new(customer_id, chat_id);
        session.order_ref = Some(order_ref);
        session.status = SessionStatus::AwaitingOperator;
        session
    }

    /// Returns the bound operator, if connected.
    pub fn bound_operator(&self) -> Option<OperatorId> {
        match self.status {
            SessionStatus::Connected { operator } => Some(operator),
            _ => None,
        }
    }

    /// Whether the session is bound to an operator.
    pub fn is_connected(&self) -> bool {
        self.bound_operator().is_some()
    }

    /// Whether the session is waiting for an operator.
    pub fn is_awaiting(&self) -> bool {
        self.status == SessionStatus::AwaitingOperator
    }

    /// Binds the session to an operator, returning the previously bound one.
    pub fn bind(&mut self, operator: OperatorId) -> Option<OperatorId> {
        let previous = self.bound_operator();
        self.status = SessionStatus::Connected { operator };
        self.touch();
        previous
    }

    /// Moves a `New` session to `AwaitingOperator`. Other statuses are kept.
    pub fn mark_awaiting(&mut self) {
        if self.status == SessionStatus::New {
            self.status = SessionStatus::AwaitingOperator;
        }
        self.touch();
    }

    /// Attaches an order reference. A connected session keeps its operator.
    pub fn attach_order(&mut self, order_ref: OrderRef) {
        self.order_ref = Some(order_ref);
        self.mark_awaiting();
    }

    /// Marks the acknowledgement as sent.
    ///
    /// Returns `true` only on the first call for this session.
    pub fn mark_welcome_sent(&mut self) -> bool {
        if self.welcome_sent {
            return false;
        }
        self.welcome_sent = true;
        self.touch();
        true
    }

    /// Whether an unclaimed session has gone untouched for longer than `ttl`.
    ///
    /// Connected sessions never go stale.
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.is_connected() && now - self.updated_at > ttl
    }

    /// Updates the last-mutated timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
