//! Request DTOs for the API.
//!
//! Order submissions arrive in several shapes. [`SendOrderRequest::from_json`]
//! accepts all of them and [`SendOrderRequest::into_order`] turns the result
//! into the canonical [`Order`], rejecting anything incomplete.

use serde::Deserialize;
use serde_json::Value;

use relay_core::DeliveryPricing;
use relay_models::{CustomerContact, LineItem, Order};

use crate::error::{ApiError, Result};

/// Order submission from the storefront.
///
/// Canonical shape:
/// `{ items: [{name, size, quantity, price}], customer: {...}, deliveryPrice, totalPrice }`.
/// Also accepted: the whole body nested under `order`, items carrying a
/// nested `product` object, `shippingCost` for `deliveryPrice` and `total`
/// for `totalPrice`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOrderRequest {
    /// Ordered items.
    #[serde(default)]
    pub items: Option<Vec<OrderItemPayload>>,
    /// Buyer contact and address.
    #[serde(default)]
    pub customer: Option<CustomerContact>,
    /// Delivery cost; derived from the city when absent.
    #[serde(default, alias = "shippingCost")]
    pub delivery_price: Option<f64>,
    /// Total computed by the storefront.
    #[serde(default, alias = "total")]
    pub total_price: Option<f64>,
}

/// One item of an order submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderItemPayload {
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: Option<u32>,
    pub price: Option<f64>,
    /// Cart entries carry the product instead of flat fields.
    pub product: Option<ProductPayload>,
}

/// Product embedded in a cart entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPayload {
    pub name: Option<String>,
    pub price: Option<f64>,
}

impl SendOrderRequest {
    /// Parses a submission, unwrapping a body nested under `order`.
    pub fn from_json(value: Value) -> Result<Self> {
        let value = match value {
            Value::Object(mut map) if !map.contains_key("items") && map.contains_key("order") => {
                map.remove("order").unwrap_or(Value::Null)
            }
            other => other,
        };
        if !value.is_object() {
            return Err(ApiError::BadRequest("order payload must be an object".to_string()));
        }
        serde_json::from_value(value)
            .map_err(|e| ApiError::BadRequest(format!("invalid order payload: {}", e)))
    }

    /// Builds the canonical order.
    pub fn into_order(self, pricing: &DeliveryPricing) -> Result<Order> {
        let items = self
            .items
            .filter(|items| !items.is_empty())
            .ok_or_else(|| ApiError::BadRequest("order has no items".to_string()))?;
        let customer = self
            .customer
            .ok_or_else(|| ApiError::BadRequest("order has no customer".to_string()))?;

        let items = items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| item.into_line_item(idx + 1))
            .collect::<Result<Vec<_>>>()?;

        let delivery_price = match self.delivery_price {
            Some(price) if !price.is_finite() || price < 0.0 => {
                return Err(ApiError::BadRequest(format!(
                    "invalid delivery price: {}",
                    price
                )))
            }
            Some(price) => price,
            None => pricing.price_for_city(&customer.city),
        };

        Ok(Order {
            items,
            customer,
            delivery_price,
            client_total: self.total_price,
        })
    }
}

impl OrderItemPayload {
    fn into_line_item(self, position: usize) -> Result<LineItem> {
        let product = self.product.unwrap_or_default();

        let name = self
            .name
            .or(product.name)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::BadRequest(format!("item {} has no name", position)))?;
        let price = self
            .price
            .or(product.price)
            .filter(|p| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| ApiError::BadRequest(format!("item {} has no valid price", position)))?;
        let quantity = match self.quantity {
            Some(0) => {
                return Err(ApiError::BadRequest(format!(
                    "item {} has zero quantity",
                    position
                )))
            }
            Some(q) => q,
            None => 1,
        };

        Ok(LineItem::new(name, self.size.unwrap_or_default(), quantity, price))
    }
}
