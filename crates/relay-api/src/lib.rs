//! HTTP surface of the storefront relay.
//!
//! This crate exposes the relay over HTTP:
//! - Order submission from the storefront (`POST /api/telegram/send-order`)
//! - Bot webhook updates (`POST /api/telegram/webhook`)
//! - Health check (`GET /api/health`)
//!
//! # Example
//!
//! ```ignore
//! use relay_api::{serve, ApiConfig, AppState};
//! use relay_core::RelayConfig;
//! use relay_telegram::TelegramGateway;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let relay = RelayConfig::from_lookup(|key| std::env::var(key).ok())?;
//!     let gateway = Arc::new(TelegramGateway::new(&relay.bot_token, relay.send_timeout)?);
//!     let state = AppState::build(ApiConfig::default(), &relay, "ShopBot", gateway)?;
//!
//!     serve(ApiConfig::default(), state).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod types;

pub use config::ApiConfig;
pub use error::{ApiError, Result};
pub use router::{create_router, serve};
pub use state::AppState;
