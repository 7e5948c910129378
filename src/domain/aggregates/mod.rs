//! Aggregates module
pub mod product;
pub mod cart;

pub use product::{visible_products, Product, LOW_STOCK_THRESHOLD};
pub use cart::{Cart, CartError, CartLine};
