//! In-memory collaborators for checkout tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Money, ProductId};
use crate::services::{
    AuthSession, AuthToken, CatalogError, CatalogService, ClientSecret, PaymentAuthorizer, PaymentConfirmation,
    PaymentError, PaymentIntentStatus, PaymentMethod, Session, User,
};
use rust_decimal::Decimal;

pub fn pid(id: &str) -> ProductId { ProductId::new(id).unwrap() }

pub fn money(units: i64, scale: u32) -> Money { Money::new(Decimal::new(units, scale)).unwrap() }

pub fn product(id: &str, price: Money, stock: u32) -> Product { Product::new(pid(id), id.to_uppercase(), price, stock) }

pub fn signed_in() -> Arc<AuthSession> {
    Arc::new(AuthSession::with_session(Session {
        token: AuthToken::new("test-token"),
        user: User { id: "u1".into(), name: "Ana".into(), email: "ana@example.com".into(), role: None },
    }))
}

#[derive(Default)]
pub struct FakeCatalog {
    stock: Mutex<HashMap<ProductId, Product>>,
    failing_reads: Mutex<HashSet<ProductId>>,
    failing_writes: Mutex<HashSet<ProductId>>,
    pub reads: Mutex<Vec<ProductId>>,
    pub writes: Mutex<Vec<(ProductId, u32)>>,
}

impl FakeCatalog {
    pub fn with(products: Vec<Product>) -> Arc<Self> {
        let catalog = Self::default();
        for p in products {
            catalog.stock.lock().unwrap().insert(p.id().clone(), p);
        }
        Arc::new(catalog)
    }

    pub fn set_stock(&self, id: &str, stock: u32) {
        let mut products = self.stock.lock().unwrap();
        let current = products.get(&pid(id)).cloned().unwrap();
        products.insert(pid(id), Product::new(pid(id), current.name(), *current.price(), stock));
    }

    pub fn stock_of(&self, id: &str) -> u32 { self.stock.lock().unwrap()[&pid(id)].stock() }

    pub fn fail_reads_of(&self, id: &str) { self.failing_reads.lock().unwrap().insert(pid(id)); }

    pub fn fail_writes_of(&self, id: &str) { self.failing_writes.lock().unwrap().insert(pid(id)); }

    pub fn heal_writes(&self) { self.failing_writes.lock().unwrap().clear(); }
}

#[async_trait]
impl CatalogService for FakeCatalog {
    async fn product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        self.reads.lock().unwrap().push(id.clone());
        if self.failing_reads.lock().unwrap().contains(id) {
            return Err(CatalogError::Transport("connection reset".into()));
        }
        self.stock.lock().unwrap().get(id).cloned().ok_or_else(|| CatalogError::NotFound(id.clone()))
    }

    async fn products(&self, category: Option<&str>) -> Result<Vec<Product>, CatalogError> {
        let products = self.stock.lock().unwrap();
        Ok(products.values().filter(|p| category.is_none() || p.category() == category).cloned().collect())
    }

    async fn search(&self, query: &str) -> Result<Vec<Product>, CatalogError> {
        let products = self.stock.lock().unwrap();
        Ok(products.values().filter(|p| p.name().to_lowercase().contains(&query.to_lowercase())).cloned().collect())
    }

    async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        let products = self.stock.lock().unwrap();
        let mut categories: Vec<String> = products.values().filter_map(|p| p.category().map(String::from)).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn update_stock(&self, id: &ProductId, new_stock: u32, _token: &AuthToken) -> Result<(), CatalogError> {
        if self.failing_writes.lock().unwrap().contains(id) {
            return Err(CatalogError::Http { status: 500, message: "write failed".into() });
        }
        self.writes.lock().unwrap().push((id.clone(), new_stock));
        self.set_stock(id.as_str(), new_stock);
        Ok(())
    }
}

pub enum ConfirmBehavior {
    Succeed,
    Decline(&'static str),
    End(PaymentIntentStatus),
    /// Succeeds after the delay.
    Slow(Duration),
}

pub struct FakeAuthorizer {
    behavior: ConfirmBehavior,
    /// When set, `create_intent` waits for a notification first.
    pub gate: Option<Arc<Notify>>,
    pub intents: Mutex<Vec<i64>>,
    pub confirmations: Mutex<u32>,
}

impl FakeAuthorizer {
    pub fn new(behavior: ConfirmBehavior) -> Arc<Self> {
        Arc::new(Self { behavior, gate: None, intents: Mutex::new(vec![]), confirmations: Mutex::new(0) })
    }

    pub fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self { behavior: ConfirmBehavior::Succeed, gate: Some(gate), intents: Mutex::new(vec![]), confirmations: Mutex::new(0) })
    }

    pub fn intents(&self) -> Vec<i64> { self.intents.lock().unwrap().clone() }
}

#[async_trait]
impl PaymentAuthorizer for FakeAuthorizer {
    async fn create_intent(&self, amount_minor: i64, _token: &AuthToken) -> Result<ClientSecret, PaymentError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.intents.lock().unwrap().push(amount_minor);
        Ok(ClientSecret::new(format!("pi_{amount_minor}_secret")))
    }

    async fn confirm(&self, _secret: &ClientSecret, _method: PaymentMethod) -> Result<PaymentConfirmation, PaymentError> {
        *self.confirmations.lock().unwrap() += 1;
        match &self.behavior {
            ConfirmBehavior::Succeed => Ok(PaymentConfirmation { status: PaymentIntentStatus::Succeeded }),
            ConfirmBehavior::Decline(reason) => Err(PaymentError::Declined(reason.to_string())),
            ConfirmBehavior::End(status) => Ok(PaymentConfirmation { status: *status }),
            ConfirmBehavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(PaymentConfirmation { status: PaymentIntentStatus::Succeeded })
            }
        }
    }
}
