//! Cart engine
//!
//! Owns the session's single [`Cart`] and publishes every new state on a
//! `watch` channel that the presentation layer subscribes to.

use tokio::sync::watch;

use crate::domain::aggregates::{Cart, CartError, Product};
use crate::domain::value_objects::{Money, MoneyError, ProductId};

pub struct CartEngine {
    cart: Cart,
    updates: watch::Sender<Cart>,
}

impl Default for CartEngine {
    fn default() -> Self { Self::new() }
}

impl CartEngine {
    pub fn new() -> Self {
        let cart = Cart::new();
        let (updates, _) = watch::channel(cart.clone());
        Self { cart, updates }
    }

    pub fn cart(&self) -> &Cart { &self.cart }

    /// Receiver that always holds the latest cart state.
    pub fn subscribe(&self) -> watch::Receiver<Cart> { self.updates.subscribe() }

    pub fn add_item(&mut self, product: Product, quantity: u32) -> Result<(), CartError> {
        let product_id = product.id().clone();
        if let Err(e) = self.cart.add_item(product, quantity) {
            tracing::debug!(%product_id, quantity, error = %e, "add to cart rejected");
            return Err(e);
        }
        tracing::debug!(%product_id, quantity, "added to cart");
        self.publish();
        Ok(())
    }

    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: u32) -> Result<(), CartError> {
        self.cart.update_quantity(product_id, quantity)?;
        tracing::debug!(%product_id, quantity, "cart quantity set");
        self.publish();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: &ProductId) {
        if self.cart.remove_item(product_id) {
            tracing::debug!(%product_id, "removed from cart");
            self.publish();
        }
    }

    pub fn clear(&mut self) {
        if self.cart.is_empty() { return; }
        self.cart.clear();
        tracing::debug!(cart_id = %self.cart.id(), "cart cleared");
        self.publish();
    }

    pub fn compute_subtotal(&self) -> Result<Money, MoneyError> { self.cart.subtotal() }

    pub fn compute_total(&self, shipping: &Money) -> Result<Money, MoneyError> { self.cart.total(shipping) }

    /// Keeps only the lines for `products`; used once some inventory
    /// updates of a paid checkout have gone through.
    pub(crate) fn retain_products(&mut self, products: &[ProductId]) {
        self.cart.retain_products(products);
        self.publish();
    }

    /// Takes `quantity` paid units of a product off the cart. Units added
    /// after the payment stay; the line goes once none are left.
    pub(crate) fn release_paid(&mut self, product_id: &ProductId, quantity: u32) {
        let Some(current) = self.cart.line(product_id).map(|l| l.quantity()) else { return };
        if current <= quantity {
            self.remove_item(product_id);
        } else if let Err(e) = self.update_quantity(product_id, current - quantity) {
            tracing::warn!(%product_id, error = %e, "could not release paid units");
        }
    }

    fn publish(&self) { self.updates.send_replace(self.cart.clone()); }
}
