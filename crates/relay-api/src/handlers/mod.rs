//! API request handlers.

pub mod health;
pub mod orders;
pub mod webhook;

pub use health::*;
pub use orders::*;
pub use webhook::*;
