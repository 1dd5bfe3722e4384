//! Relay Core - shared configuration and rendering for the storefront relay.
//!
//! - **config**: environment-driven relay configuration
//! - **delivery**: city-based delivery price lookup
//! - **links**: deep links back to the bot
//! - **render**: operator-facing order summaries and HTML escaping

pub mod config;
pub mod delivery;
pub mod links;
pub mod render;

pub use config::{load_env_files, parse_operator_ids, ConfigError, RelayConfig};
pub use delivery::DeliveryPricing;
pub use links::DeepLinkBuilder;
pub use render::{
    format_amount, html_escape, html_escape_clipped, message_len, render_failure_diagnostic,
    render_order_summary, MAX_MESSAGE_LEN,
};
