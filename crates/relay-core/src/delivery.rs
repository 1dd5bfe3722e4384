//! City-based delivery price lookup.

/// Flat delivery price charged outside the free cities.
pub const DEFAULT_FLAT_DELIVERY_PRICE: f64 = 1200.0;

/// City fragment with free delivery by default.
pub const DEFAULT_FREE_CITY: &str = "астан";

/// Delivery pricing: free for matching cities, a flat price elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryPricing {
    /// Price charged when the city matches no free fragment.
    pub flat_price: f64,
    /// Lowercase substrings identifying cities with free delivery.
    pub free_city_fragments: Vec<String>,
}

impl Default for DeliveryPricing {
    fn default() -> Self {
        Self {
            flat_price: DEFAULT_FLAT_DELIVERY_PRICE,
            free_city_fragments: vec![DEFAULT_FREE_CITY.to_string()],
        }
    }
}

impl DeliveryPricing {
    /// Delivery price for a city name. An empty city costs nothing.
    pub fn price_for_city(&self, city: &str) -> f64 {
        let normalized = city.trim().to_lowercase();
        if normalized.is_empty() {
            return 0.0;
        }
        if self
            .free_city_fragments
            .iter()
            .any(|fragment| normalized.contains(fragment.as_str()))
        {
            0.0
        } else {
            self.flat_price
        }
    }
}
