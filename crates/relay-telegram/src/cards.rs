//! Texts and keyboards the relay sends.
//!
//! Cards for operators use the HTML parse mode; customer-supplied text is
//! always escaped before it is embedded.

use relay_core::{html_escape, html_escape_clipped, MAX_MESSAGE_LEN};
use relay_models::{CallbackAction, CustomerId, OrderRef, Session};

use crate::gateway::{Button, Keyboard};

/// Room left for the customer's text inside a relayed card.
const RELAYED_TEXT_LEN: usize = MAX_MESSAGE_LEN - 64;

/// Sent once to a customer arriving through an order link.
pub const ORDER_WELCOME: &str = "✅ Your order has been received! An operator will join the chat shortly.";

/// Sent once to a customer who writes before an operator joined.
pub const AWAITING_ACK: &str = "✅ Thank you! An operator will reply to you shortly.";

/// Sent to a customer who opens the bot without an order.
pub const BARE_START_GREETING: &str = "👋 Hello! Write your question here and an operator will answer.";

/// Sent to a customer when an operator claims the conversation.
pub const OPERATOR_JOINED: &str = "An operator has joined the chat ✅";

/// Callback notice after a successful connect.
pub const CALLBACK_CONNECTED: &str = "Connected to customer";

/// Callback notice when the customer has no session.
pub const CALLBACK_NOT_FOUND: &str = "Customer not found";

/// Callback notice for presses the relay does not act on.
pub const CALLBACK_NOOP: &str = "Nothing to do";

/// Most awaiting customers offered in one keyboard.
pub const MAX_KEYBOARD_CUSTOMERS: usize = 10;

/// Keyboard with a single connect button for one customer.
pub fn connect_keyboard(customer: CustomerId) -> Keyboard {
    Keyboard::single(Button::callback(
        "👤 Connect to chat",
        CallbackAction::Connect(customer).encode(),
    ))
}

/// Keyboard with a connect button per awaiting customer, oldest first.
pub fn awaiting_keyboard(sessions: &[Session]) -> Keyboard {
    let mut awaiting: Vec<&Session> = sessions.iter().filter(|s| s.is_awaiting()).collect();
    awaiting.sort_by_key(|s| s.updated_at);

    let mut keyboard = Keyboard::default();
    for session in awaiting.into_iter().take(MAX_KEYBOARD_CUSTOMERS) {
        let label = match &session.order_ref {
            Some(order) => format!("👤 {} · order {}", session.customer_id, order),
            None => format!("👤 {}", session.customer_id),
        };
        keyboard.push_row(Button::callback(
            label,
            CallbackAction::Connect(session.customer_id).encode(),
        ));
    }
    keyboard
}

/// Card announcing a customer who arrived through an order link.
pub fn new_customer_card(customer: CustomerId, order_ref: &OrderRef) -> String {
    format!(
        "🆕 <b>New customer in the bot</b>\nCustomer: <code>{}</code>\nOrder: <code>{}</code>",
        customer,
        html_escape(order_ref.as_str())
    )
}

/// Card broadcasting a message from an unclaimed customer.
pub fn customer_message_card(customer: CustomerId, text: &str) -> String {
    format!(
        "📩 New message from <code>{}</code>:\n{}",
        customer,
        html_escape_clipped(text, RELAYED_TEXT_LEN)
    )
}

/// Message relayed to the operator bound to a customer.
pub fn forwarded_from_customer(customer: CustomerId, text: &str) -> String {
    format!(
        "Message from <code>{}</code>:\n{}",
        customer,
        html_escape_clipped(text, RELAYED_TEXT_LEN)
    )
}

/// Confirmation for the operator who claimed a customer.
pub fn operator_connected(customer: CustomerId) -> String {
    format!("✅ Connected to chat with customer <code>{}</code>.", customer)
}

/// Notice for an operator whose customer was claimed by someone else.
pub fn operator_replaced(customer: CustomerId) -> String {
    format!(
        "ℹ️ Customer <code>{}</code> was taken over by another operator.",
        customer
    )
}

/// Warning for an operator who writes without a bound customer.
pub fn unbound_warning(has_awaiting: bool) -> String {
    if has_awaiting {
        "⚠️ You are not connected to any customer, so your message was not delivered.\n\
        Pick a customer waiting for an operator:"
            .to_string()
    } else {
        "⚠️ You are not connected to any customer, so your message was not delivered.\n\
        Nobody is waiting for an operator right now."
            .to_string()
    }
}

/// Listing of every session for the `/sessions` command.
pub fn session_listing(sessions: &[Session]) -> String {
    if sessions.is_empty() {
        return "No customer sessions.".to_string();
    }

    let mut sorted: Vec<&Session> = sessions.iter().collect();
    sorted.sort_by_key(|s| s.created_at);

    let mut text = format!("<b>Customer sessions ({}):</b>\n", sorted.len());
    for session in sorted {
        let marker = match session.bound_operator() {
            Some(_) => "✅",
            None if session.is_awaiting() => "⏳",
            None => "🆕",
        };
        text.push_str(&format!(
            "{} <code>{}</code> {}",
            marker,
            session.customer_id,
            session.status.label()
        ));
        if let Some(operator) = session.bound_operator() {
            text.push_str(&format!(" to <code>{}</code>", operator));
        }
        if let Some(order) = &session.order_ref {
            text.push_str(&format!(" · order <code>{}</code>", html_escape(order.as_str())));
        }
        text.push('\n');
    }
    text
}
