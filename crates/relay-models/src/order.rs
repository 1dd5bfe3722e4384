//! Order types produced by the storefront.
//!
//! These are the canonical, already-normalized shapes. The relay renders them
//! into a text summary and does not persist them.

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing money amounts.
const AMOUNT_EPSILON: f64 = 0.005;

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Product name.
    pub name: String,
    /// Selected size, may be empty.
    #[serde(default)]
    pub size: String,
    /// Number of units.
    pub quantity: u32,
    /// Price of a single unit.
    pub price: f64,
}

impl LineItem {
    /// Creates a line item.
    pub fn new(name: impl Into<String>, size: impl Into<String>, quantity: u32, price: f64) -> Self {
        Self {
            name: name.into(),
            size: size.into(),
            quantity,
            price,
        }
    }

    /// Quantity times unit price.
    pub fn line_total(&self) -> f64 {
        f64::from(self.quantity) * self.price
    }
}

/// Customer contact and delivery address block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerContact {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub city: String,
    pub address: String,
    pub apartment: String,
    pub postal_code: String,
    pub comments: String,
}

impl CustomerContact {
    /// First and last name joined, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// A submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Ordered items, never empty after normalization.
    pub items: Vec<LineItem>,
    /// Contact and address of the buyer.
    pub customer: CustomerContact,
    /// Delivery cost.
    pub delivery_price: f64,
    /// Total as computed by the storefront, if it sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_total: Option<f64>,
}

impl Order {
    /// Sum of all line totals.
    pub fn items_total(&self) -> f64 {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Items total plus delivery.
    pub fn grand_total(&self) -> f64 {
        self.items_total() + self.delivery_price
    }

    /// Returns the storefront's total when it disagrees with the computed one.
    pub fn total_mismatch(&self) -> Option<f64> {
        self.client_total
            .filter(|client| (client - self.grand_total()).abs() > AMOUNT_EPSILON)
    }
}
