//! REST client for the storefront API.
//!
//! Responses use the envelopes `{ success, producto }`, `{ success, data }`
//! and `{ data: { token, user } }`; errors carry `{ message }`.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use validator::Validate;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::ProductId;
use crate::services::auth::{Credentials, Registration};
use crate::services::{AuthError, AuthToken, CatalogError, CatalogService, ClientSecret, PaymentError, Session};

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct ProductEnvelope {
    success: bool,
    producto: Option<Product>,
}

#[derive(Deserialize)]
struct ListEnvelope<T> {
    success: bool,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Deserialize)]
struct SessionEnvelope {
    data: Session,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Deserialize)]
struct IntentBody {
    #[serde(rename = "clientSecret")]
    client_secret: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into().trim_end_matches('/').to_string() }
    }

    fn url(&self, path: &str) -> String { format!("{}{}", self.base_url, path) }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        credentials.validate()?;
        self.authenticate("/login", credentials).await
    }

    pub async fn register(&self, registration: &Registration) -> Result<Session, AuthError> {
        registration.validate()?;
        self.authenticate("/register", registration).await
    }

    async fn authenticate<B: serde::Serialize + Sync>(&self, path: &str, body: &B) -> Result<Session, AuthError> {
        let response = self.http.post(self.url(path)).json(body).send().await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let message = error_message(response).await.unwrap_or_else(|| format!("authentication failed ({status})"));
            return Err(AuthError::Rejected(message));
        }
        let envelope: SessionEnvelope = response.json().await.map_err(|e| AuthError::Decode(e.to_string()))?;
        tracing::debug!(user_id = %envelope.data.user.id, "authenticated");
        Ok(envelope.data)
    }

    /// `POST /create-payment-intent`; the amount is in cents.
    pub async fn create_payment_intent(&self, amount_minor: i64, token: &AuthToken) -> Result<ClientSecret, PaymentError> {
        let response = self.http.post(self.url("/create-payment-intent"))
            .bearer_auth(token.as_str())
            .json(&serde_json::json!({ "amount": amount_minor }))
            .send().await
            .map_err(|e| if e.is_timeout() { PaymentError::Timeout } else { PaymentError::Network(e.to_string()) })?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(PaymentError::Rejected(error_message(response).await.unwrap_or_else(|| status.to_string())));
        }
        let body: IntentBody = response.json().await.map_err(|e| PaymentError::Network(e.to_string()))?;
        Ok(ClientSecret::new(body.client_secret))
    }

    async fn fetch_list<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>, CatalogError> {
        let envelope: ListEnvelope<T> = decode(send(request).await?).await?;
        if !envelope.success {
            return Err(CatalogError::Rejected("list request was not successful".into()));
        }
        Ok(envelope.data)
    }
}

async fn send(request: RequestBuilder) -> Result<Response, CatalogError> {
    let response = request.send().await.map_err(|e| CatalogError::Transport(e.to_string()))?;
    match response.status() {
        s if s.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CatalogError::Unauthorized),
        status => {
            let message = error_message(response).await.unwrap_or_default();
            Err(CatalogError::Http { status: status.as_u16(), message })
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, CatalogError> {
    response.json().await.map_err(|e| CatalogError::Decode(e.to_string()))
}

async fn error_message(response: Response) -> Option<String> {
    response.json::<ErrorBody>().await.ok().and_then(|b| b.message)
}

#[async_trait]
impl CatalogService for ApiClient {
    async fn product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        let request = self.http.get(self.url(&format!("/productos/{}", id)));
        let response = match send(request).await {
            Err(CatalogError::Http { status: 404, .. }) => return Err(CatalogError::NotFound(id.clone())),
            other => other?,
        };
        let envelope: ProductEnvelope = decode(response).await?;
        match envelope {
            ProductEnvelope { success: true, producto: Some(product) } => Ok(product),
            _ => Err(CatalogError::NotFound(id.clone())),
        }
    }

    async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, CatalogError> {
        let path = match category {
            Some(c) => format!("/productos/categoria/{}", c),
            None => "/productos".to_string(),
        };
        self.fetch_list(self.http.get(self.url(&path))).await
    }

    async fn search(&self, query: &str) -> Result<Vec<Product>, CatalogError> {
        self.fetch_list(self.http.get(self.url("/productos")).query(&[("search", query)])).await
    }

    async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        self.fetch_list(self.http.get(self.url("/categorias"))).await
    }

    async fn update_stock(&self, id: &ProductId, new_stock: u32, token: &AuthToken) -> Result<(), CatalogError> {
        let request = self.http.put(self.url(&format!("/productos/{}", id)))
            .bearer_auth(token.as_str())
            .json(&serde_json::json!({ "existencia": new_stock }));
        send(request).await?;
        tracing::debug!(product_id = %id, new_stock, "stock written");
        Ok(())
    }
}
