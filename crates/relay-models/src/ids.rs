//! Type-safe ID wrappers for the relay.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Macro to generate numeric messaging-platform ID newtypes.
macro_rules! define_platform_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Returns the raw platform identifier.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }
    };
}

define_platform_id!(CustomerId);
define_platform_id!(OperatorId);
define_platform_id!(ChatId);

impl CustomerId {
    /// The chat a customer is reached at in a private conversation.
    pub fn private_chat(self) -> ChatId {
        ChatId(self.0)
    }
}

impl OperatorId {
    /// The chat an operator is reached at in a private conversation.
    pub fn private_chat(self) -> ChatId {
        ChatId(self.0)
    }
}

/// Reference to a submitted order, carried in deep links as `order_<ref>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderRef(String);

impl OrderRef {
    /// Prefix used for the deep-link start payload.
    pub const START_PREFIX: &'static str = "order_";

    /// Creates a reference from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the start payload for this order (`order_<ref>`).
    pub fn start_payload(&self) -> String {
        format!("{}{}", Self::START_PREFIX, self.0)
    }

    /// Parses a start payload of the form `order_<ref>`.
    pub fn from_start_payload(payload: &str) -> Option<Self> {
        payload
            .strip_prefix(Self::START_PREFIX)
            .filter(|rest| !rest.is_empty())
            .map(Self::from_string)
    }
}

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
