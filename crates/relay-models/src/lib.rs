//! Core data models for the storefront relay.
//!
//! This crate provides the data types shared by the relay crates: platform
//! identifiers, customer sessions, orders, and inbound bot updates.

pub mod ids;
pub mod order;
pub mod session;
pub mod update;

// Re-export main types
pub use ids::{ChatId, CustomerId, OperatorId, OrderRef};
pub use order::{CustomerContact, LineItem, Order};
pub use session::{Session, SessionStatus};
pub use update::{CallbackAction, InboundUpdate, RelayUpdate};
