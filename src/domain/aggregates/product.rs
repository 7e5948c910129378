//! Product snapshot
//!
//! A read-only copy of a catalog entry. The cart caches one per line at
//! add-time, so price and stock may be stale by checkout.

use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{Money, ProductId};

/// Stock at or below this count is shown with a "last units" badge.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    id: ProductId,
    #[serde(rename = "nombre")]
    name: String,
    #[serde(rename = "precio")]
    price: Money,
    #[serde(rename = "existencia", default)]
    stock: u32,
    #[serde(rename = "categoria", default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(rename = "imagenes", default)]
    images: Vec<String>,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, price: Money, stock: u32) -> Self {
        Self { id, name: name.into(), price, stock, category: None, images: vec![] }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn id(&self) -> &ProductId { &self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn price(&self) -> &Money { &self.price }
    pub fn stock(&self) -> u32 { self.stock }
    pub fn category(&self) -> Option<&str> { self.category.as_deref() }
    pub fn images(&self) -> &[String] { &self.images }
    pub fn is_in_stock(&self) -> bool { self.stock > 0 }
    pub fn is_low_stock(&self) -> bool { self.is_in_stock() && self.stock <= LOW_STOCK_THRESHOLD }
}

/// Products a shopper may see. Admins also see sold-out entries.
pub fn visible_products(products: Vec<Product>, is_admin: bool) -> Vec<Product> {
    if is_admin { return products; }
    products.into_iter().filter(Product::is_in_stock).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn product(id: &str, stock: u32) -> Product {
        Product::new(ProductId::new(id).unwrap(), "Taza", Money::new(Decimal::new(10, 0)).unwrap(), stock)
    }

    #[test]
    fn test_stock_flags() {
        assert!(!product("a", 0).is_in_stock());
        assert!(!product("a", 0).is_low_stock());
        assert!(product("a", 5).is_low_stock());
        assert!(!product("a", 6).is_low_stock());
    }

    #[test]
    fn test_visible_products_hides_sold_out_for_shoppers() {
        let all = vec![product("a", 0), product("b", 3)];
        let shopper = visible_products(all.clone(), false);
        assert_eq!(shopper.len(), 1);
        assert_eq!(shopper[0].id().as_str(), "b");
        assert_eq!(visible_products(all, true).len(), 2);
    }

    #[test]
    fn test_deserialize_api_shape() {
        let json = r#"{"_id":"p1","nombre":"Taza","precio":12.5,"existencia":4,"categoria":"Hogar","imagenes":["a.jpg"],"__v":0}"#;
        let p: Product = serde_json::from_str(json).unwrap();
        assert_eq!(p.id().as_str(), "p1");
        assert_eq!(p.price().amount(), Decimal::new(125, 1));
        assert_eq!(p.stock(), 4);
        assert_eq!(p.category(), Some("Hogar"));
        assert_eq!(p.images().len(), 1);
    }
}
