//! Telegram operator relay for the storefront.
//!
//! This crate connects storefront customers with a desk of human operators
//! through a Telegram bot:
//!
//! - **gateway**: outbound calls to the bot API behind [`MessagingGateway`]
//! - **store**: customer sessions and per-customer locking
//! - **notifier**: order summaries fanned out to operators
//! - **dispatcher**: the relay state machine driven by webhook updates
//! - **bot**: webhook registration and the stale-session sweeper
//!
//! The bot does not poll; updates arrive through the HTTP webhook served by
//! `relay-api` and are handed to [`RelayDispatcher::handle`].

pub mod bot;
pub mod cards;
pub mod commands;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod notifier;
pub mod recording;
pub mod store;

pub use bot::{spawn_session_sweeper, RelayBot, DEFAULT_SWEEP_INTERVAL};
pub use commands::{OperatorCommand, StartCommand};
pub use dispatcher::{DispatchOutcome, RelayDispatcher};
pub use error::{RelayError, Result};
pub use gateway::{fan_out, Button, FanOutReport, Keyboard, MessagingGateway, SendOptions, TelegramGateway};
pub use notifier::{OrderNotifier, OrderReceipt, OrderRefGenerator};
pub use recording::RecordingGateway;
pub use store::{InMemorySessionStore, KeyedLocks, SessionStore};
