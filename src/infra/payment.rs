//! Payment authorizer backed by the storefront API.
//!
//! The intent is created server-side through [`ApiClient`]; confirmation is
//! handed to a [`PaymentConfirmer`] wrapping the card provider's SDK.

use async_trait::async_trait;
use std::sync::Arc;

use crate::infra::http::ApiClient;
use crate::services::{
    AuthToken, ClientSecret, PaymentAuthorizer, PaymentConfirmation, PaymentConfirmer, PaymentError, PaymentMethod,
};

pub struct ApiPaymentAuthorizer {
    api: ApiClient,
    confirmer: Arc<dyn PaymentConfirmer>,
}

impl ApiPaymentAuthorizer {
    pub fn new(api: ApiClient, confirmer: Arc<dyn PaymentConfirmer>) -> Self {
        Self { api, confirmer }
    }
}

#[async_trait]
impl PaymentAuthorizer for ApiPaymentAuthorizer {
    async fn create_intent(&self, amount_minor: i64, token: &AuthToken) -> Result<ClientSecret, PaymentError> {
        let secret = self.api.create_payment_intent(amount_minor, token).await?;
        tracing::debug!(amount_minor, "payment intent created");
        Ok(secret)
    }

    async fn confirm(&self, secret: &ClientSecret, method: PaymentMethod) -> Result<PaymentConfirmation, PaymentError> {
        let confirmation = self.confirmer.confirm(secret, method).await?;
        tracing::debug!(status = ?confirmation.status, "payment confirmation returned");
        Ok(confirmation)
    }
}
