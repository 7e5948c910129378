//! Storefront cart core
//!
//! Client-side shopping cart and checkout for the storefront app.
//!
//! ## Features
//! - Cart line management with one line per product
//! - Subtotal, flat-rate shipping and minor-unit charge amounts
//! - Live stock validation before checkout
//! - Checkout sequencing: payment authorization, stock decrement, cart clear
//! - Durable checkout journal for reconciling paid but unfinished attempts
//!
//! ```no_run
//! use std::sync::Arc;
//! use storefront_cart::services::PaymentConfirmer;
//! use storefront_cart::{ApiClient, ApiPaymentAuthorizer, AuthSession, CartEngine, CheckoutSequencer};
//! # fn card_sdk() -> Arc<dyn PaymentConfirmer> { unimplemented!() }
//!
//! let api = ApiClient::new("http://localhost:5000/api");
//! let payments = Arc::new(ApiPaymentAuthorizer::new(api.clone(), card_sdk()));
//! let auth = Arc::new(AuthSession::new());
//! let sequencer = CheckoutSequencer::new(Arc::new(api), payments, auth);
//! let mut cart = CartEngine::new();
//! # let _ = (&sequencer, &mut cart);
//! ```

pub mod checkout;
pub mod domain;
pub mod engine;
pub mod infra;
pub mod pricing;
pub mod services;

pub use checkout::{CheckoutOutcome, CheckoutPhase, CheckoutRejection, CheckoutSequencer, PaymentDetails};
pub use domain::aggregates::{visible_products, Cart, CartError, CartLine, Product};
pub use domain::value_objects::{Money, MoneyError, ProductId};
pub use engine::CartEngine;
pub use infra::{ApiClient, ApiPaymentAuthorizer, StorefrontConfig};
pub use pricing::ShippingPolicy;
pub use services::{AuthSession, CatalogService, PaymentAuthorizer};
