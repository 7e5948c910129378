//! Checkout events
//!
//! Each step of a checkout attempt is recorded as one event so that an
//! attempt interrupted after payment can be reconciled later.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::ProductId;
use crate::pricing::Quote;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CheckoutEvent {
    Started { quote: Quote, lines: Vec<LineRecord> },
    PaymentCaptured,
    PaymentFailed { reason: String, indeterminate: bool },
    InventoryUpdated { product_id: ProductId, new_stock: u32 },
    ReconciliationRequired { failed: Vec<ProductId> },
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRecord {
    pub attempt_id: Uuid,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: CheckoutEvent,
}

impl CheckoutRecord {
    pub fn now(attempt_id: Uuid, event: CheckoutEvent) -> Self {
        Self { attempt_id, at: Utc::now(), event }
    }
}
