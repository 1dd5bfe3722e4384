//! Messaging gateway client.
//!
//! [`MessagingGateway`] is the only way the relay talks to the bot API. The
//! production implementation wraps a teloxide [`Bot`]; tests and dry runs use
//! [`crate::recording::RecordingGateway`].

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use relay_models::ChatId;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, LinkPreviewOptions, ParseMode};
use tracing::{debug, warn};

use crate::error::{RelayError, Result};

/// An inline button carrying a callback payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Label shown to the user.
    pub text: String,
    /// Payload delivered back in the callback query.
    pub data: String,
}

impl Button {
    /// Creates a callback button.
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// Inline keyboard attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    /// Button rows, top to bottom.
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// Keyboard with a single button.
    pub fn single(button: Button) -> Self {
        Self {
            rows: vec![vec![button]],
        }
    }

    /// Appends a row holding one button.
    pub fn push_row(&mut self, button: Button) {
        self.rows.push(vec![button]);
    }

    /// Whether the keyboard has no buttons.
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    fn to_markup(&self) -> InlineKeyboardMarkup {
        InlineKeyboardMarkup::new(self.rows.iter().map(|row| {
            row.iter()
                .map(|b| InlineKeyboardButton::callback(b.text.clone(), b.data.clone()))
                .collect::<Vec<_>>()
        }))
    }
}

/// Options for an outbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Render the text with the HTML parse mode.
    pub html: bool,
    /// Suppress link previews.
    pub disable_link_preview: bool,
    /// Inline keyboard to attach.
    pub keyboard: Option<Keyboard>,
}

impl SendOptions {
    /// Plain text, no markup.
    pub fn plain() -> Self {
        Self::default()
    }

    /// HTML parse mode.
    pub fn html() -> Self {
        Self {
            html: true,
            ..Self::default()
        }
    }

    /// Attaches a keyboard.
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    /// Suppresses link previews.
    pub fn without_link_preview(mut self) -> Self {
        self.disable_link_preview = true;
        self
    }
}

/// Outbound calls to the messaging API.
///
/// Implementations hold no relay state. Failures are reported to the caller,
/// which logs them; nothing is retried.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Send a message to a chat.
    async fn send_message(&self, recipient: ChatId, text: &str, options: &SendOptions) -> Result<()>;

    /// Resolve a pending button press, optionally showing a short notice.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;
}

/// Gateway backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    /// Creates a gateway whose every request is bounded by `timeout`.
    pub fn new(token: &str, timeout: Duration) -> Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::BotStartFailed(format!("HTTP client: {}", e)))?;
        Ok(Self {
            bot: Bot::with_client(token, client),
        })
    }

    /// The underlying teloxide bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_message(&self, recipient: ChatId, text: &str, options: &SendOptions) -> Result<()> {
        let mut req = self.bot.send_message(teloxide::types::ChatId(recipient.0), text);

        if options.html {
            req = req.parse_mode(ParseMode::Html);
        }
        if options.disable_link_preview {
            req = req.link_preview_options(LinkPreviewOptions {
                is_disabled: true,
                url: None,
                prefer_small_media: false,
                prefer_large_media: false,
                show_above_text: false,
            });
        }
        if let Some(keyboard) = options.keyboard.as_ref().filter(|k| !k.is_empty()) {
            req = req.reply_markup(keyboard.to_markup());
        }

        req.await?;
        debug!(chat_id = %recipient, "Message sent");
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let mut req = self.bot.answer_callback_query(callback_id.to_string());
        if let Some(text) = text {
            req = req.text(text);
        }
        req.await?;
        Ok(())
    }
}

/// Outcome of sending one message to many recipients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Number of successful sends.
    pub delivered: usize,
    /// Recipients whose send failed.
    pub failed: Vec<ChatId>,
}

/// Send the same message to every recipient with at most `max_concurrent`
/// requests in flight. One recipient's failure does not affect the others.
pub async fn fan_out(
    gateway: &dyn MessagingGateway,
    recipients: &[ChatId],
    text: &str,
    options: &SendOptions,
    max_concurrent: usize,
) -> FanOutReport {
    let results: Vec<(ChatId, Result<()>)> = stream::iter(recipients.iter().copied())
        .map(|chat| async move { (chat, gateway.send_message(chat, text, options).await) })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let mut report = FanOutReport::default();
    for (chat, result) in results {
        match result {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                warn!(chat_id = %chat, error = %e, "Failed to deliver message");
                report.failed.push(chat);
            }
        }
    }
    report
}
