use serde::{Deserialize, Serialize};

use crate::product::CatalogError;

/// What the viewer hands to the storefront when the shopper adds the
/// customized product to the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartIntent {
    pub slug: String,
    pub quantity: u32,
    /// `[width, depth, height]`
    pub scale_factors: [f64; 3],
    pub price_adjustment: f64,
    /// List price plus `price_adjustment`.
    pub unit_price: f64,
    pub summary: String,
}

impl AddToCartIntent {
    pub fn line_total(&self) -> f64 {
        self.unit_price * f64::from(self.quantity)
    }
}

/// Cart mutation collaborator.
pub trait CartSink {
    fn add_to_cart(&mut self, intent: &AddToCartIntent) -> Result<(), CatalogError>;
}

/// Keeps every accepted intent in memory.
#[derive(Debug, Default)]
pub struct InMemoryCart {
    pub lines: Vec<AddToCartIntent>,
}

impl InMemoryCart {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartSink for InMemoryCart {
    fn add_to_cart(&mut self, intent: &AddToCartIntent) -> Result<(), CatalogError> {
        if intent.quantity == 0 {
            return Err(CatalogError::Rejected("quantity must be positive".into()));
        }
        self.lines.push(intent.clone());
        Ok(())
    }
}
