//! Cart Aggregate

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Money, MoneyError, ProductId};
use crate::pricing;

/// One product in the cart. `quantity` is never zero.
#[derive(Clone, Debug, PartialEq)]
pub struct CartLine {
    product: Product,
    quantity: u32,
}

impl CartLine {
    pub fn product_id(&self) -> &ProductId { self.product.id() }
    pub fn product(&self) -> &Product { &self.product }
    pub fn quantity(&self) -> u32 { self.quantity }
    pub fn line_total(&self) -> Result<Money, MoneyError> { self.product.price().multiply(self.quantity) }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cart {
    id: String,
    lines: Vec<CartLine>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self { Self::new() }
}

impl Cart {
    pub fn new() -> Self {
        let now = Utc::now();
        Self { id: Uuid::new_v4().to_string(), lines: vec![], created_at: now, updated_at: now }
    }

    pub fn id(&self) -> &str { &self.id }
    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> { self.lines.iter().find(|l| l.product_id() == product_id) }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn line_count(&self) -> usize { self.lines.len() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Total units across all lines (the cart badge number).
    pub fn item_count(&self) -> u64 { self.lines.iter().map(|l| u64::from(l.quantity)).sum() }

    /// Adds `quantity` units, merging into an existing line for the same
    /// product. The line keeps the most recent product snapshot.
    pub fn add_item(&mut self, product: Product, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity); }
        if let Some(existing) = self.lines.iter_mut().find(|l| l.product_id() == product.id()) {
            existing.quantity = existing.quantity.saturating_add(quantity);
            existing.product = product;
        } else {
            self.lines.push(CartLine { product, quantity });
        }
        self.touch();
        Ok(())
    }

    /// Sets the quantity of an existing line; zero removes the line.
    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Result<(), CartError> {
        let line = self.lines.iter_mut().find(|l| l.product_id() == product_id)
            .ok_or_else(|| CartError::ItemNotFound(product_id.clone()))?;
        if quantity == 0 { self.lines.retain(|l| l.product_id() != product_id); }
        else { line.quantity = quantity; }
        self.touch();
        Ok(())
    }

    /// Returns whether a line was removed. Removing an absent product is a no-op.
    pub fn remove_item(&mut self, product_id: &ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id() != product_id);
        let removed = self.lines.len() != before;
        if removed { self.touch(); }
        removed
    }

    pub fn clear(&mut self) {
        if !self.lines.is_empty() { self.lines.clear(); self.touch(); }
    }

    /// Drops every line whose product is not in `keep`.
    pub fn retain_products(&mut self, keep: &[ProductId]) {
        self.lines.retain(|l| keep.contains(l.product_id()));
        self.touch();
    }

    pub fn subtotal(&self) -> Result<Money, MoneyError> { pricing::subtotal(&self.lines) }

    pub fn total(&self, shipping: &Money) -> Result<Money, MoneyError> { pricing::total(&self.subtotal()?, shipping) }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("product {0} is not in the cart")]
    ItemNotFound(ProductId),
}
