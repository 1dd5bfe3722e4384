//! Bot commands understood by the relay.

use relay_models::OrderRef;
use teloxide::utils::command::BotCommands;

/// Commands an operator can send to the bot. Anything else an operator
/// writes is relayed to their customers.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Operator commands:")]
pub enum OperatorCommand {
    #[command(description = "Show this help")]
    Help,

    #[command(description = "List customer sessions")]
    Sessions,
}

impl OperatorCommand {
    /// Parse an operator command, ignoring anything that is not one.
    pub fn parse_text(text: &str, bot_username: &str) -> Option<Self> {
        Self::parse(text, bot_username).ok()
    }

    /// Help text listing every operator command.
    pub fn help_text() -> String {
        Self::descriptions().to_string()
    }
}

/// A `/start` command as sent when a user opens a deep link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartCommand {
    /// `/start order_<ref>`.
    Order(OrderRef),
    /// `/start` without a payload.
    Bare,
    /// `/start` with a payload the relay does not recognize.
    Unknown(String),
}

impl StartCommand {
    /// Parse `/start [payload]`. `/start@Name` counts only when `Name` is
    /// this bot, compared case-insensitively.
    pub fn parse(text: &str, bot_username: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let command = parts.next()?;
        let rest = command.strip_prefix("/start")?;
        match rest.strip_prefix('@') {
            Some(mention) if mention.eq_ignore_ascii_case(bot_username.trim_start_matches('@')) => {}
            Some(_) => return None,
            None if rest.is_empty() => {}
            None => return None,
        }

        Some(match parts.next() {
            None => StartCommand::Bare,
            Some(payload) => match OrderRef::from_start_payload(payload) {
                Some(order_ref) => StartCommand::Order(order_ref),
                None => StartCommand::Unknown(payload.to_string()),
            },
        })
    }
}
