//! Checkout sequencer
//!
//! Drives one checkout attempt through
//! `Idle -> Validating -> Authorizing -> Updating` and always answers with a
//! [`CheckoutOutcome`]; no error escapes this boundary.
//!
//! Stock validation is advisory. Nothing is reserved on the server, so a
//! concurrent buyer can still take the last units between validation and
//! the post-payment stock write; such a write then fails and the attempt
//! ends in [`CheckoutOutcome::PartialUpdateFailed`].

pub mod details;
pub mod journal;
pub mod outcome;
#[cfg(test)]
pub(crate) mod testing;

use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartLine};
use crate::domain::events::{CheckoutEvent, CheckoutRecord, LineRecord};
use crate::domain::value_objects::Money;
use crate::engine::CartEngine;
use crate::pricing::{self, Quote};
use crate::services::{AuthSession, AuthToken, CatalogService, PaymentAuthorizer, PaymentIntentStatus};

pub use details::PaymentDetails;
pub use journal::{pending_attempts, CheckoutJournal, FileJournal, JournalError, MemoryJournal, PendingAttempt};
pub use outcome::{
    CheckoutOutcome, CheckoutPhase, CheckoutRejection, DecrementFailure, PaymentFailure, Receipt, Reconciliation,
    StockShortfall,
};

pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);

pub struct CheckoutSequencer {
    catalog: Arc<dyn CatalogService>,
    payments: Arc<dyn PaymentAuthorizer>,
    auth: Arc<AuthSession>,
    journal: Arc<dyn CheckoutJournal>,
    confirm_timeout: Duration,
    in_flight: AtomicBool,
    phase: watch::Sender<CheckoutPhase>,
}

/// Holds the single-attempt flag. On drop, including when the caller
/// abandons the attempt mid-flight, the phase goes back to `Idle` and the
/// flag is released.
struct InFlight<'a> {
    flag: &'a AtomicBool,
    phase: &'a watch::Sender<CheckoutPhase>,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, phase: &'a watch::Sender<CheckoutPhase>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).ok().map(|_| Self { flag, phase })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.phase.send_replace(CheckoutPhase::Idle);
        self.flag.store(false, Ordering::Release);
    }
}

impl CheckoutSequencer {
    pub fn new(catalog: Arc<dyn CatalogService>, payments: Arc<dyn PaymentAuthorizer>, auth: Arc<AuthSession>) -> Self {
        let (phase, _) = watch::channel(CheckoutPhase::Idle);
        Self {
            catalog, payments, auth,
            journal: Arc::new(MemoryJournal::new()),
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            in_flight: AtomicBool::new(false),
            phase,
        }
    }

    pub fn with_journal(mut self, journal: Arc<dyn CheckoutJournal>) -> Self {
        self.journal = journal;
        self
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    pub fn journal(&self) -> &Arc<dyn CheckoutJournal> { &self.journal }

    pub fn phase(&self) -> watch::Receiver<CheckoutPhase> { self.phase.subscribe() }

    /// Lines whose live stock is below the requested quantity. A line
    /// whose stock cannot be read counts as short.
    pub async fn validate_availability(&self, cart: &Cart) -> Vec<StockShortfall> {
        let checks = cart.lines().iter().map(|line| async move {
            match self.catalog.product(line.product_id()).await {
                Ok(live) if live.stock() >= line.quantity() => None,
                Ok(live) => Some(shortfall(line, Some(live.stock()))),
                Err(e) => {
                    tracing::warn!(product_id = %line.product_id(), error = %e, "stock lookup failed");
                    Some(shortfall(line, None))
                }
            }
        });
        join_all(checks).await.into_iter().flatten().collect()
    }

    pub async fn checkout(&self, engine: &mut CartEngine, payment: &PaymentDetails, shipping: &Money) -> CheckoutOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight, &self.phase) else {
            tracing::warn!("checkout rejected: another attempt is in flight");
            return CheckoutOutcome::Rejected(CheckoutRejection::InProgress);
        };
        self.run(engine, payment, shipping).await
    }

    async fn run(&self, engine: &mut CartEngine, payment: &PaymentDetails, shipping: &Money) -> CheckoutOutcome {
        if engine.cart().is_empty() {
            return CheckoutOutcome::Rejected(CheckoutRejection::EmptyCart);
        }
        if let Some(reason) = payment.incomplete_reason() {
            return CheckoutOutcome::Rejected(CheckoutRejection::IncompletePayment(reason));
        }
        let Some(token) = self.auth.current_token() else {
            return CheckoutOutcome::Rejected(CheckoutRejection::Unauthenticated);
        };

        self.phase.send_replace(CheckoutPhase::Validating);
        let shortfalls = self.validate_availability(engine.cart()).await;
        if !shortfalls.is_empty() {
            tracing::info!(count = shortfalls.len(), "checkout halted: insufficient stock");
            return CheckoutOutcome::ValidationFailed(shortfalls);
        }

        let quote = match pricing::quote(engine.cart(), shipping) {
            Ok(quote) => quote,
            Err(e) => return CheckoutOutcome::Rejected(CheckoutRejection::Pricing(e)),
        };
        let amount_minor = quote.amount_minor;
        let attempt_id = Uuid::new_v4();
        let lines: Vec<LineRecord> = engine.cart().lines().iter()
            .map(|l| LineRecord { product_id: l.product_id().clone(), quantity: l.quantity() })
            .collect();
        self.record(attempt_id, CheckoutEvent::Started { quote, lines: lines.clone() }).await;
        tracing::info!(%attempt_id, amount_minor, "checkout started");

        self.phase.send_replace(CheckoutPhase::Authorizing);
        if let Err(failure) = self.authorize(attempt_id, amount_minor, payment, &token).await {
            tracing::warn!(%attempt_id, reason = %failure.reason, indeterminate = failure.indeterminate, "payment failed");
            self.record(attempt_id, CheckoutEvent::PaymentFailed { reason: failure.reason.clone(), indeterminate: failure.indeterminate }).await;
            return CheckoutOutcome::PaymentFailed(failure);
        }

        self.phase.send_replace(CheckoutPhase::Updating);
        let failed = self.decrement_stock(attempt_id, &lines, &token).await;
        if failed.is_empty() {
            engine.clear();
            self.complete(attempt_id).await;
            return CheckoutOutcome::Success(Receipt::new(attempt_id, &quote, lines));
        }
        engine.retain_products(&failed.iter().map(|f| f.product_id.clone()).collect::<Vec<_>>());
        self.require_reconciliation(attempt_id, quote, failed).await
    }

    /// Re-runs only the stock writes of a paid attempt; no new charge is
    /// made. Works from a [`Reconciliation`] returned by `checkout` or one
    /// rebuilt from the journal with [`pending_attempts`]. Only the paid
    /// units of lines written here leave the cart; anything added since
    /// stays.
    pub async fn resume_inventory_update(&self, engine: &mut CartEngine, pending: &Reconciliation) -> CheckoutOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight, &self.phase) else {
            return CheckoutOutcome::Rejected(CheckoutRejection::InProgress);
        };
        let Some(token) = self.auth.current_token() else {
            return CheckoutOutcome::Rejected(CheckoutRejection::Unauthenticated);
        };
        let attempt_id = pending.attempt_id;
        let lines: Vec<LineRecord> = pending.failed.iter()
            .map(|f| LineRecord { product_id: f.product_id.clone(), quantity: f.quantity })
            .collect();
        tracing::info!(%attempt_id, lines = lines.len(), "resuming inventory update");

        self.phase.send_replace(CheckoutPhase::Updating);
        let failed = self.decrement_stock(attempt_id, &lines, &token).await;
        let written: Vec<LineRecord> = lines.into_iter()
            .filter(|l| !failed.iter().any(|f| f.product_id == l.product_id))
            .collect();
        for line in &written {
            engine.release_paid(&line.product_id, line.quantity);
        }
        if failed.is_empty() {
            self.complete(attempt_id).await;
            return CheckoutOutcome::Success(Receipt::new(attempt_id, &pending.quote, written));
        }
        self.require_reconciliation(attempt_id, pending.quote, failed).await
    }

    /// Creates the intent, then confirms it on a detached task so that a
    /// timeout here never cancels a confirmation already in progress. The
    /// task journals the capture itself.
    async fn authorize(&self, attempt_id: Uuid, amount_minor: i64, payment: &PaymentDetails, token: &AuthToken) -> Result<(), PaymentFailure> {
        let secret = self.payments.create_intent(amount_minor, token).await.map_err(|e| PaymentFailure {
            reason: e.to_string(),
            indeterminate: e.is_indeterminate(),
        })?;

        let payments = Arc::clone(&self.payments);
        let journal = Arc::clone(&self.journal);
        let method = payment.method;
        let confirmation = tokio::spawn(async move {
            let result = payments.confirm(&secret, method).await;
            if matches!(&result, Ok(c) if c.status == PaymentIntentStatus::Succeeded) {
                tracing::info!(%attempt_id, "payment captured");
                if let Err(e) = journal.append(&CheckoutRecord::now(attempt_id, CheckoutEvent::PaymentCaptured)).await {
                    tracing::error!(%attempt_id, error = %e, "failed to journal captured payment");
                }
            }
            result
        });

        match tokio::time::timeout(self.confirm_timeout, confirmation).await {
            Err(_) => Err(PaymentFailure {
                reason: format!("no answer from payment provider after {:?}", self.confirm_timeout),
                indeterminate: true,
            }),
            Ok(Err(join_error)) => Err(PaymentFailure { reason: join_error.to_string(), indeterminate: true }),
            Ok(Ok(Err(e))) => Err(PaymentFailure { reason: e.to_string(), indeterminate: e.is_indeterminate() }),
            Ok(Ok(Ok(c))) => match c.status {
                PaymentIntentStatus::Succeeded => Ok(()),
                PaymentIntentStatus::Processing => Err(PaymentFailure { reason: "payment is still processing".into(), indeterminate: true }),
                status => Err(PaymentFailure { reason: format!("payment ended as {status:?}"), indeterminate: false }),
            },
        }
    }

    /// Writes `stock - quantity` for every line concurrently, re-reading
    /// stock right before each write.
    async fn decrement_stock(&self, attempt_id: Uuid, lines: &[LineRecord], token: &AuthToken) -> Vec<DecrementFailure> {
        let writes = lines.iter().map(|line| async move {
            let result = async {
                let current = self.catalog.product(&line.product_id).await.map_err(|e| e.to_string())?;
                let new_stock = current.stock().checked_sub(line.quantity).ok_or_else(|| {
                    format!("only {} left, {} sold", current.stock(), line.quantity)
                })?;
                self.catalog.update_stock(&line.product_id, new_stock, token).await.map_err(|e| e.to_string())?;
                Ok::<u32, String>(new_stock)
            }.await;
            match result {
                Ok(new_stock) => {
                    self.record(attempt_id, CheckoutEvent::InventoryUpdated { product_id: line.product_id.clone(), new_stock }).await;
                    None
                }
                Err(reason) => {
                    tracing::error!(%attempt_id, product_id = %line.product_id, %reason, "stock update failed after payment");
                    Some(DecrementFailure { product_id: line.product_id.clone(), quantity: line.quantity, reason })
                }
            }
        });
        join_all(writes).await.into_iter().flatten().collect()
    }

    async fn complete(&self, attempt_id: Uuid) {
        self.record(attempt_id, CheckoutEvent::Completed).await;
        tracing::info!(%attempt_id, "checkout completed");
    }

    async fn require_reconciliation(&self, attempt_id: Uuid, quote: Quote, failed: Vec<DecrementFailure>) -> CheckoutOutcome {
        let reconciliation = Reconciliation { attempt_id, quote, failed };
        self.record(attempt_id, CheckoutEvent::ReconciliationRequired { failed: reconciliation.failed_products() }).await;
        tracing::error!(%attempt_id, failed = reconciliation.failed.len(), "payment captured but stock updates failed");
        CheckoutOutcome::PartialUpdateFailed(reconciliation)
    }

    async fn record(&self, attempt_id: Uuid, event: CheckoutEvent) {
        if let Err(e) = self.journal.append(&CheckoutRecord::now(attempt_id, event)).await {
            tracing::error!(%attempt_id, error = %e, "failed to journal checkout event");
        }
    }
}

fn shortfall(line: &CartLine, available: Option<u32>) -> StockShortfall {
    StockShortfall {
        product_id: line.product_id().clone(),
        name: line.product().name().to_string(),
        requested: line.quantity(),
        available,
    }
}
