//! Inbound bot updates.
//!
//! The webhook body is deserialized into the lenient [`InboundUpdate`] DTO and
//! then normalized into a [`RelayUpdate`], the only shape the dispatcher sees.

use serde::Deserialize;

use crate::ids::{ChatId, CustomerId};

/// Raw update as delivered by the messaging platform.
///
/// Only the fields the relay reads are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundUpdate {
    /// Platform sequence number.
    #[serde(default)]
    pub update_id: Option<i64>,
    /// A new incoming message.
    #[serde(default)]
    pub message: Option<InboundMessage>,
    /// A button press on an inline keyboard.
    #[serde(default)]
    pub callback_query: Option<InboundCallback>,
}

/// Incoming message.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Sender; absent for channel posts.
    #[serde(default)]
    pub from: Option<InboundUser>,
    /// Chat the message was sent in.
    pub chat: InboundChat,
    /// Text content; absent for media messages.
    #[serde(default)]
    pub text: Option<String>,
}

/// Button-press callback.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundCallback {
    /// Opaque callback identifier, used to acknowledge the press.
    pub id: String,
    /// Who pressed the button.
    pub from: InboundUser,
    /// Data attached to the button.
    #[serde(default)]
    pub data: Option<String>,
}

/// Platform user.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InboundUser {
    pub id: i64,
}

/// Platform chat.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InboundChat {
    pub id: i64,
}

/// Normalized update handled by the relay dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayUpdate {
    /// A text message.
    Message {
        /// Sender identifier.
        sender: i64,
        /// Chat to reply in.
        chat_id: ChatId,
        /// Message text.
        text: String,
    },
    /// An inline button press.
    Callback {
        /// Identifier used to acknowledge the press.
        callback_id: String,
        /// Who pressed the button.
        sender: i64,
        /// Button payload, empty when none was attached.
        data: String,
    },
    /// Anything the relay does not act on.
    Unsupported {
        /// Why the update was not classified.
        reason: &'static str,
    },
}

impl From<InboundUpdate> for RelayUpdate {
    fn from(update: InboundUpdate) -> Self {
        if let Some(cb) = update.callback_query {
            return RelayUpdate::Callback {
                callback_id: cb.id,
                sender: cb.from.id,
                data: cb.data.unwrap_or_default(),
            };
        }

        let Some(msg) = update.message else {
            return RelayUpdate::Unsupported {
                reason: "no message or callback_query",
            };
        };
        let Some(from) = msg.from else {
            return RelayUpdate::Unsupported {
                reason: "message without sender",
            };
        };
        match msg.text {
            Some(text) => RelayUpdate::Message {
                sender: from.id,
                chat_id: ChatId(msg.chat.id),
                text,
            },
            None => RelayUpdate::Unsupported {
                reason: "message without text",
            },
        }
    }
}

/// Action encoded in an inline button payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Operator claims the conversation with a customer.
    Connect(CustomerId),
}

impl CallbackAction {
    const CONNECT_PREFIX: &'static str = "connect:";
    const LEGACY_CONNECT_PREFIX: &'static str = "admin_connect:";

    /// Parses a button payload such as `connect:42`.
    pub fn parse(data: &str) -> Option<Self> {
        let id = data
            .strip_prefix(Self::CONNECT_PREFIX)
            .or_else(|| data.strip_prefix(Self::LEGACY_CONNECT_PREFIX))?;
        id.parse::<CustomerId>().ok().map(CallbackAction::Connect)
    }

    /// Encodes the action as a button payload.
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Connect(customer) => format!("{}{}", Self::CONNECT_PREFIX, customer),
        }
    }
}
