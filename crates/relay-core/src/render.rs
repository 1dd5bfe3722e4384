//! Order summary rendering.
//!
//! Output is HTML for the bot API's `HTML` parse mode, so every value that
//! came from the storefront goes through [`html_escape`]. Rendered messages
//! never exceed [`MAX_MESSAGE_LEN`]; long free-text fields are clipped after
//! escaping and surplus items are folded into a count.

use relay_models::{Order, OrderRef};
use url::Url;

/// Longest text the bot API accepts in one message, in UTF-16 code units.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Cap for short customer fields (name, phone, city...).
const MAX_FIELD_LEN: usize = 256;
const MAX_ADDRESS_LEN: usize = 512;
const MAX_COMMENTS_LEN: usize = 1024;
const MAX_REASON_LEN: usize = 512;

/// Room kept for the "...and N more items" line.
const ITEMS_OVERFLOW_RESERVE: usize = 48;

const TRUNCATED_MARKER: &str = "\n…(truncated)";

/// Escape text for the HTML parse mode.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape text and cut it so the escaped result fits in `max` units.
///
/// Entities are never split. A clipped result ends with `…`.
pub fn html_escape_clipped(s: &str, max: usize) -> String {
    let escaped = html_escape(s);
    if message_len(&escaped) <= max {
        return escaped;
    }

    let budget = max.saturating_sub(1);
    let mut out = String::new();
    let mut len = 0;
    for c in s.chars() {
        let mut buf = [0u8; 4];
        let piece = match c {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            _ => &*c.encode_utf8(&mut buf),
        };
        let piece_len = message_len(piece);
        if len + piece_len > budget {
            break;
        }
        out.push_str(piece);
        len += piece_len;
    }
    out.push('…');
    out
}

/// Length of a message as the bot API counts it.
pub fn message_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Format a money amount: whole numbers without decimals, others with two.
pub fn format_amount(amount: f64) -> String {
    if amount.fract().abs() < f64::EPSILON {
        format!("{:.0}", amount)
    } else {
        format!("{:.2}", amount)
    }
}

/// Render the operator-facing summary of a submitted order.
pub fn render_order_summary(order: &Order, order_ref: &OrderRef, link: &Url) -> String {
    let header = format!(
        "🛒 <b>New order</b>\n№: <code>{}</code>\n\n<b>Items:</b>\n",
        html_escape(order_ref.as_str())
    );

    let customer = &order.customer;
    let mut address = customer.address.trim().to_string();
    if !customer.apartment.trim().is_empty() {
        address.push_str(&format!(", apt. {}", customer.apartment.trim()));
    }
    let field = |value: &str| html_escape_clipped(value.trim(), MAX_FIELD_LEN);

    let mut contact = String::from("\n<b>Customer:</b>\n");
    contact.push_str(&format!("Name: {}\n", field(&customer.full_name())));
    contact.push_str(&format!("Phone: {}\n", field(&customer.phone)));
    contact.push_str(&format!("Email: {}\n", field(&customer.email)));
    contact.push_str(&format!("City: {}\n", field(&customer.city)));
    contact.push_str(&format!(
        "Address: {}\n",
        html_escape_clipped(&address, MAX_ADDRESS_LEN)
    ));
    contact.push_str(&format!("Postal code: {}\n", field(&customer.postal_code)));
    if !customer.comments.trim().is_empty() {
        contact.push_str(&format!(
            "Comments: {}\n",
            html_escape_clipped(customer.comments.trim(), MAX_COMMENTS_LEN)
        ));
    }

    let footer = format!(
        "\nDelivery: {}\n<b>Total: {}</b>\n\n🔗 <a href=\"{}\">Open chat with the customer</a>",
        format_amount(order.delivery_price),
        format_amount(order.grand_total()),
        html_escape(link.as_str())
    );

    let fixed = message_len(&header) + message_len(&contact) + message_len(&footer);
    let items = render_items(order, MAX_MESSAGE_LEN.saturating_sub(fixed));

    format!("{}{}{}{}", header, items, contact, footer)
}

/// Item lines fitting in `budget`, with a count of any that did not fit.
fn render_items(order: &Order, budget: usize) -> String {
    let mut text = String::new();
    let mut used = 0;

    for (idx, item) in order.items.iter().enumerate() {
        let size = if item.size.trim().is_empty() {
            String::new()
        } else {
            format!(" — {}", html_escape_clipped(item.size.trim(), MAX_FIELD_LEN))
        };
        let line = format!(
            "{}. {}{} × {} = {}\n",
            idx + 1,
            html_escape_clipped(&item.name, MAX_FIELD_LEN),
            size,
            item.quantity,
            format_amount(item.line_total())
        );

        let remaining = order.items.len() - idx - 1;
        let reserve = if remaining > 0 { ITEMS_OVERFLOW_RESERVE } else { 0 };
        if used + message_len(&line) + reserve > budget {
            text.push_str(&format!("…and {} more items\n", order.items.len() - idx));
            break;
        }
        used += message_len(&line);
        text.push_str(&line);
    }

    text
}

/// Render the diagnostic sent to operators when an order could not be read.
pub fn render_failure_diagnostic(reason: &str, raw_payload: &str) -> String {
    let head = format!(
        "⚠️ <b>Order submission failed</b>\nReason: {}\n\n<pre>",
        html_escape_clipped(reason, MAX_REASON_LEN)
    );
    let tail = "</pre>";

    let room = MAX_MESSAGE_LEN.saturating_sub(message_len(&head) + message_len(tail));
    let escaped = html_escape(raw_payload);
    if message_len(&escaped) <= room {
        return format!("{}{}{}", head, escaped, tail);
    }

    let excerpt = html_escape_clipped(raw_payload, room.saturating_sub(message_len(TRUNCATED_MARKER)));
    format!("{}{}{}{}", head, excerpt, tail, TRUNCATED_MARKER)
}
