//! Centralized configuration (environment variables + defaults).

use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::domain::value_objects::Money;
use crate::pricing::ShippingPolicy;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_SHIPPING_FLAT_RATE: &str = "5";
pub const DEFAULT_CONFIRM_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_JOURNAL_PATH: &str = "checkout-journal.jsonl";

#[derive(Clone, Debug, PartialEq)]
pub struct StorefrontConfig {
    pub api_base_url: String,
    pub shipping: ShippingPolicy,
    pub payment_confirm_timeout: Duration,
    pub journal_path: PathBuf,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl StorefrontConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = lookup("API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid { var: "API_BASE_URL", reason: "must be an http(s) URL".into() });
        }

        let rate = lookup("SHIPPING_FLAT_RATE").unwrap_or_else(|| DEFAULT_SHIPPING_FLAT_RATE.to_string());
        let rate = Decimal::from_str(rate.trim())
            .map_err(|e| ConfigError::Invalid { var: "SHIPPING_FLAT_RATE", reason: e.to_string() })?;
        let rate = Money::new(rate).map_err(|e| ConfigError::Invalid { var: "SHIPPING_FLAT_RATE", reason: e.to_string() })?;

        let timeout_secs = match lookup("PAYMENT_CONFIRM_TIMEOUT_SECS") {
            Some(v) => v.trim().parse::<u64>()
                .map_err(|e| ConfigError::Invalid { var: "PAYMENT_CONFIRM_TIMEOUT_SECS", reason: e.to_string() })?
                .max(1),
            None => DEFAULT_CONFIRM_TIMEOUT_SECS,
        };

        let journal_path = lookup("CHECKOUT_JOURNAL_PATH").unwrap_or_else(|| DEFAULT_JOURNAL_PATH.to_string());

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            shipping: ShippingPolicy::FlatRate(rate),
            payment_confirm_timeout: Duration::from_secs(timeout_secs),
            journal_path: PathBuf::from(journal_path),
        })
    }
}
