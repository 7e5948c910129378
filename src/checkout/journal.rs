//! Durable log of checkout attempts.
//!
//! Records survive the process, so a payment captured right before the
//! app is killed still shows up in [`pending_attempts`].

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::checkout::outcome::{DecrementFailure, Reconciliation};
use crate::domain::events::{CheckoutEvent, CheckoutRecord, LineRecord};
use crate::domain::value_objects::ProductId;
use crate::pricing::Quote;

#[async_trait]
pub trait CheckoutJournal: Send + Sync {
    async fn append(&self, record: &CheckoutRecord) -> Result<(), JournalError>;
    async fn records(&self) -> Result<Vec<CheckoutRecord>, JournalError>;
}

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt journal entry on line {line}: {source}")]
    Corrupt { line: usize, source: serde_json::Error },

    #[error("failed to encode journal entry: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Default)]
pub struct MemoryJournal {
    records: Mutex<Vec<CheckoutRecord>>,
}

impl MemoryJournal {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl CheckoutJournal for MemoryJournal {
    async fn append(&self, record: &CheckoutRecord) -> Result<(), JournalError> {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).push(record.clone());
        Ok(())
    }

    async fn records(&self) -> Result<Vec<CheckoutRecord>, JournalError> {
        Ok(self.records.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }
}

/// One JSON object per line, appended and flushed per record.
pub struct FileJournal {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: tokio::sync::Mutex::new(()) }
    }

    pub fn path(&self) -> &Path { &self.path }
}

#[async_trait]
impl CheckoutJournal for FileJournal {
    async fn append(&self, record: &CheckoutRecord) -> Result<(), JournalError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        file.sync_data().await?;
        Ok(())
    }

    async fn records(&self) -> Result<Vec<CheckoutRecord>, JournalError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        contents
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| serde_json::from_str(l).map_err(|source| JournalError::Corrupt { line: i + 1, source }))
            .collect()
    }
}

/// A paid attempt whose stock updates are not all recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAttempt {
    pub attempt_id: Uuid,
    pub quote: Quote,
    /// Lines still owed a stock write, with the quantities that were paid for.
    pub outstanding: Vec<LineRecord>,
}

impl From<PendingAttempt> for Reconciliation {
    fn from(pending: PendingAttempt) -> Self {
        let failed = pending.outstanding.into_iter()
            .map(|line| DecrementFailure {
                product_id: line.product_id,
                quantity: line.quantity,
                reason: "stock write not recorded".into(),
            })
            .collect();
        Reconciliation { attempt_id: pending.attempt_id, quote: pending.quote, failed }
    }
}

#[derive(Default)]
struct AttemptState {
    quote: Option<Quote>,
    lines: Vec<LineRecord>,
    updated: Vec<ProductId>,
    captured: bool,
    completed: bool,
}

/// Attempts that captured payment but never completed. Attempts whose
/// `started` record is missing are skipped.
pub fn pending_attempts(records: &[CheckoutRecord]) -> Vec<PendingAttempt> {
    let mut attempts: BTreeMap<Uuid, (usize, AttemptState)> = BTreeMap::new();
    for (seq, record) in records.iter().enumerate() {
        let (_, state) = attempts.entry(record.attempt_id).or_insert_with(|| (seq, AttemptState::default()));
        match &record.event {
            CheckoutEvent::Started { quote, lines } => {
                state.quote = Some(*quote);
                state.lines = lines.clone();
            }
            CheckoutEvent::PaymentCaptured => state.captured = true,
            CheckoutEvent::InventoryUpdated { product_id, .. } => state.updated.push(product_id.clone()),
            CheckoutEvent::Completed => state.completed = true,
            CheckoutEvent::PaymentFailed { .. } | CheckoutEvent::ReconciliationRequired { .. } => {}
        }
    }

    let mut pending: Vec<(usize, PendingAttempt)> = attempts
        .into_iter()
        .filter(|(_, (_, s))| s.captured && !s.completed)
        .filter_map(|(attempt_id, (seq, s))| {
            let quote = s.quote?;
            let outstanding: Vec<LineRecord> = s.lines.into_iter().filter(|l| !s.updated.contains(&l.product_id)).collect();
            if outstanding.is_empty() { return None; }
            Some((seq, PendingAttempt { attempt_id, quote, outstanding }))
        })
        .collect();
    pending.sort_by_key(|(seq, _)| *seq);
    pending.into_iter().map(|(_, p)| p).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Money;
    use rust_decimal::Decimal;

    fn pid(id: &str) -> ProductId { ProductId::new(id).unwrap() }

    fn line(id: &str, quantity: u32) -> LineRecord { LineRecord { product_id: pid(id), quantity } }

    fn quote_15() -> Quote {
        let money = |units| Money::new(Decimal::new(units, 0)).unwrap();
        Quote { subtotal: money(10), shipping: money(5), total: money(15), amount_minor: 1500 }
    }

    fn started(id: Uuid, products: &[&str]) -> CheckoutRecord {
        let lines = products.iter().map(|p| line(p, 1)).collect();
        CheckoutRecord::now(id, CheckoutEvent::Started { quote: quote_15(), lines })
    }

    #[test]
    fn test_pending_attempts() {
        let paid_partial = Uuid::new_v4();
        let paid_done = Uuid::new_v4();
        let declined = Uuid::new_v4();
        let records = vec![
            started(paid_partial, &["a", "b"]),
            started(paid_done, &["c"]),
            started(declined, &["d"]),
            CheckoutRecord::now(paid_partial, CheckoutEvent::PaymentCaptured),
            CheckoutRecord::now(paid_done, CheckoutEvent::PaymentCaptured),
            CheckoutRecord::now(declined, CheckoutEvent::PaymentFailed { reason: "declined".into(), indeterminate: false }),
            CheckoutRecord::now(paid_partial, CheckoutEvent::InventoryUpdated { product_id: pid("a"), new_stock: 4 }),
            CheckoutRecord::now(paid_done, CheckoutEvent::InventoryUpdated { product_id: pid("c"), new_stock: 0 }),
            CheckoutRecord::now(paid_done, CheckoutEvent::Completed),
        ];
        let pending = pending_attempts(&records);
        assert_eq!(pending, vec![PendingAttempt { attempt_id: paid_partial, quote: quote_15(), outstanding: vec![line("b", 1)] }]);
    }

    #[test]
    fn test_pending_attempt_keeps_paid_quantities() {
        let id = Uuid::new_v4();
        let records = vec![
            CheckoutRecord::now(id, CheckoutEvent::Started { quote: quote_15(), lines: vec![line("a", 3), line("b", 2)] }),
            CheckoutRecord::now(id, CheckoutEvent::PaymentCaptured),
            CheckoutRecord::now(id, CheckoutEvent::InventoryUpdated { product_id: pid("a"), new_stock: 7 }),
        ];
        let pending = pending_attempts(&records).remove(0);
        let reconciliation = Reconciliation::from(pending);
        assert_eq!(reconciliation.attempt_id, id);
        assert_eq!(reconciliation.amount_minor(), 1500);
        assert_eq!(reconciliation.failed.len(), 1);
        assert_eq!((reconciliation.failed[0].product_id.as_str(), reconciliation.failed[0].quantity), ("b", 2));
    }

    #[test]
    fn test_capture_without_start_is_skipped() {
        let records = vec![CheckoutRecord::now(Uuid::new_v4(), CheckoutEvent::PaymentCaptured)];
        assert!(pending_attempts(&records).is_empty());
    }

    #[test]
    fn test_capture_after_indeterminate_failure_is_pending() {
        let id = Uuid::new_v4();
        let records = vec![
            started(id, &["a"]),
            CheckoutRecord::now(id, CheckoutEvent::PaymentFailed { reason: "timed out".into(), indeterminate: true }),
            CheckoutRecord::now(id, CheckoutEvent::PaymentCaptured),
        ];
        assert_eq!(pending_attempts(&records)[0].outstanding, vec![line("a", 1)]);
    }

    #[tokio::test]
    async fn test_file_journal_round_trip() {
        let path = std::env::temp_dir().join(format!("checkout-journal-{}.jsonl", Uuid::new_v4()));
        let journal = FileJournal::new(&path);
        assert!(journal.records().await.unwrap().is_empty());

        let id = Uuid::new_v4();
        journal.append(&started(id, &["a"])).await.unwrap();
        journal.append(&CheckoutRecord::now(id, CheckoutEvent::PaymentCaptured)).await.unwrap();

        let records = journal.records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].event, CheckoutEvent::PaymentCaptured);
        assert_eq!(pending_attempts(&records).len(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_file_journal_reports_corrupt_line() {
        let path = std::env::temp_dir().join(format!("checkout-journal-{}.jsonl", Uuid::new_v4()));
        std::fs::write(&path, "{not json}\n").unwrap();
        let err = FileJournal::new(&path).records().await.unwrap_err();
        assert!(matches!(err, JournalError::Corrupt { line: 1, .. }));
        let _ = std::fs::remove_file(&path);
    }
}
