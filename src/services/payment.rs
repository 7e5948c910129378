//! Payment authorization contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::services::auth::AuthToken;

/// Handle returned when a payment intent is created; only meaningful to
/// the authorizer that issued it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(String);

impl ClientSecret {
    pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }
    pub fn expose(&self) -> &str { &self.0 }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("ClientSecret(**redacted**)") }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[default]
    Card,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentIntentStatus {
    Succeeded,
    Processing,
    RequiresAction,
    Canceled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentConfirmation {
    pub status: PaymentIntentStatus,
}

#[async_trait]
pub trait PaymentAuthorizer: Send + Sync {
    /// Creates an intent for `amount_minor` cents and returns its handle.
    async fn create_intent(&self, amount_minor: i64, token: &AuthToken) -> Result<ClientSecret, PaymentError>;

    /// Confirms the intent with the shopper's payment method. This call
    /// moves money and is never cancelled once started.
    async fn confirm(&self, secret: &ClientSecret, method: PaymentMethod) -> Result<PaymentConfirmation, PaymentError>;
}

/// The card provider's client-side confirmation step. It runs in the
/// provider's SDK on the device, which holds the card data; the storefront
/// API never sees it.
#[async_trait]
pub trait PaymentConfirmer: Send + Sync {
    async fn confirm(&self, secret: &ClientSecret, method: PaymentMethod) -> Result<PaymentConfirmation, PaymentError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("payment declined: {0}")]
    Declined(String),

    #[error("payment network error: {0}")]
    Network(String),

    #[error("payment confirmation timed out")]
    Timeout,

    #[error("payment rejected: {0}")]
    Rejected(String),
}

impl PaymentError {
    /// The charge may or may not have gone through.
    pub fn is_indeterminate(&self) -> bool { matches!(self, Self::Timeout) }
}
