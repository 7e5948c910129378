//! Typed results of a checkout attempt.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::LineRecord;
use crate::domain::value_objects::{Money, MoneyError, ProductId};
use crate::pricing::Quote;

/// Step a checkout attempt is currently in. Returns to `Idle` when the
/// attempt reaches an outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum CheckoutPhase {
    #[default]
    Idle,
    Validating,
    Authorizing,
    Updating,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// Paid, stock decremented everywhere, cart emptied.
    Success(Receipt),
    /// Refused locally before any network call.
    Rejected(CheckoutRejection),
    /// Some lines ask for more than the catalog has. Cart untouched.
    ValidationFailed(Vec<StockShortfall>),
    /// Authorizer refused or could not be reached. Cart untouched.
    PaymentFailed(PaymentFailure),
    /// Payment captured but some stock writes failed. The cart now holds
    /// only those lines.
    PartialUpdateFailed(Reconciliation),
}

impl CheckoutOutcome {
    pub fn is_success(&self) -> bool { matches!(self, Self::Success(_)) }

    /// Whether money may have moved for this attempt.
    pub fn payment_may_have_been_taken(&self) -> bool {
        match self {
            Self::Success(_) | Self::PartialUpdateFailed(_) => true,
            Self::PaymentFailed(failure) => failure.indeterminate,
            Self::Rejected(_) | Self::ValidationFailed(_) => false,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutRejection {
    #[error("cart is empty")]
    EmptyCart,

    #[error("payment details incomplete: {0}")]
    IncompletePayment(String),

    #[error("sign in to check out")]
    Unauthenticated,

    #[error("a checkout is already in progress")]
    InProgress,

    #[error("cannot price cart: {0}")]
    Pricing(#[from] MoneyError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockShortfall {
    pub product_id: ProductId,
    pub name: String,
    pub requested: u32,
    /// `None` when live stock could not be read.
    pub available: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentFailure {
    pub reason: String,
    /// True when the authorizer did not answer definitively; the shopper
    /// may have been charged.
    pub indeterminate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub attempt_id: Uuid,
    pub amount_minor: i64,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    /// Lines whose stock was written by the call that produced this
    /// receipt. A resumed attempt lists only the resumed lines.
    pub lines: Vec<LineRecord>,
    pub completed_at: DateTime<Utc>,
}

impl Receipt {
    pub(crate) fn new(attempt_id: Uuid, quote: &Quote, lines: Vec<LineRecord>) -> Self {
        Self {
            attempt_id,
            amount_minor: quote.amount_minor,
            subtotal: quote.subtotal,
            shipping: quote.shipping,
            total: quote.total,
            lines,
            completed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecrementFailure {
    pub product_id: ProductId,
    pub quantity: u32,
    pub reason: String,
}

/// A paid attempt with stock writes still owed. `quote` is what was
/// charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub attempt_id: Uuid,
    pub quote: Quote,
    pub failed: Vec<DecrementFailure>,
}

impl Reconciliation {
    pub fn amount_minor(&self) -> i64 { self.quote.amount_minor }

    pub fn failed_products(&self) -> Vec<ProductId> {
        self.failed.iter().map(|f| f.product_id.clone()).collect()
    }
}
