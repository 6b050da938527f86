//! Shopping cart model.
//!
//! The cart is an ordered sequence of lines, one per product, in the order
//! products were first added. Totals and item counts are always recomputed
//! from the lines; nothing derived is stored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use abshine_core::{Price, ProductId};

use super::product::Product;

/// One product-and-quantity entry in the cart.
///
/// Carries a denormalized copy of the product fields captured at add-time so
/// the cart stays renderable without a catalog lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product this line refers to.
    pub product_id: ProductId,
    /// Product name at add-time.
    pub name: String,
    /// Unit price at add-time.
    pub price: Price,
    /// Image URI at add-time.
    #[serde(default)]
    pub image: Option<String>,
    /// Description at add-time.
    #[serde(default)]
    pub details: String,
    /// Number of units; always at least 1.
    pub quantity: u32,
}

impl CartLine {
    /// Create a line with quantity 1 from a catalog product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            details: product.details.clone(),
            quantity: 1,
        }
    }

    /// Price × quantity for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.line_total(self.quantity)
    }
}

/// Outcome of adding a product to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was appended.
    Added,
    /// An existing line's quantity was incremented.
    Incremented,
}

/// The shopping cart: an ordered sequence of [`CartLine`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cart lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Find the line for a product, if present.
    #[must_use]
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product_id == product_id)
    }

    /// Add one unit of `product`: increments the existing line or appends a
    /// new line with quantity 1 at the end.
    pub fn add(&mut self, product: &Product) -> AddOutcome {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product.id)
        {
            line.quantity += 1;
            AddOutcome::Incremented
        } else {
            self.lines.push(CartLine::from_product(product));
            AddOutcome::Added
        }
    }

    /// Remove the line for `product_id`, returning it if it existed.
    pub fn remove(&mut self, product_id: &ProductId) -> Option<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|line| &line.product_id == product_id)?;
        Some(self.lines.remove(index))
    }

    /// Set the quantity of an existing line. Returns `false` when the line
    /// does not exist. Callers must pass a quantity of at least 1; reducing
    /// to zero is a removal, handled a level up.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> bool {
        debug_assert!(quantity >= 1);
        match self
            .lines
            .iter_mut()
            .find(|line| &line.product_id == product_id)
        {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Σ(price × quantity) over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Σ(quantity) over all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }
}
