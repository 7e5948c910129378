//! Configuration and the HTTP-backed collaborators.
pub mod config;
pub mod http;
pub mod payment;

pub use config::{ConfigError, StorefrontConfig};
pub use http::ApiClient;
pub use payment::ApiPaymentAuthorizer;
