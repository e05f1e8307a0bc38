//! Transaction ledger: durable, append-oriented record of money movements
//!
//! The ledger is the audit trail, never the balance source of truth; read
//! paths must not be used to infer current balances. Entries are
//! append-mostly: after an entry reaches a terminal state the only
//! permitted mutation is the non-monetary flag annotation.
//!
//! Status changes all funnel through one transition point that enforces the
//! lifecycle state machine, so an illegal move is rejected no matter which
//! caller attempts it.

use crate::types::{
    HistoryFilter, LedgerError, MonthlySummary, Page, Transaction, TransactionId,
    TransactionStatus, TransactionType, TypeTotal,
};
use crate::types::account::AccountId;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Balance snapshots written onto an entry at completion
///
/// Denormalized onto the entry so statements and audits are self-contained.
#[derive(Debug, Clone, Copy)]
pub struct Snapshots {
    pub from_before: Option<Decimal>,
    pub from_after: Option<Decimal>,
    pub to_before: Option<Decimal>,
    pub to_after: Option<Decimal>,
}

/// Thread-safe, append-oriented transaction ledger
pub struct TransactionLedger {
    /// Entries by internal id
    entries: DashMap<TransactionId, Transaction>,

    /// Insertion order, used to serve newest-first history queries
    order: Mutex<Vec<TransactionId>>,

    /// Next internal id; ids are monotonic, which keeps references
    /// time-ordered within a process
    next_id: AtomicU64,
}

impl TransactionLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        TransactionLedger {
            entries: DashMap::new(),
            order: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate the next internal id and its human-readable reference
    ///
    /// References look like `TXN-20260807-000042`: the creation date plus
    /// the zero-padded internal id, so lexicographic order follows
    /// creation order.
    pub fn allocate(&self, created_at: DateTime<Utc>) -> (TransactionId, String) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let reference = format!("TXN-{}-{:06}", created_at.format("%Y%m%d"), id);
        (id, reference)
    }

    /// Append a new entry
    ///
    /// The entry must carry an id from [`TransactionLedger::allocate`] and
    /// a non-terminal status (`Pending` or `Processing`).
    pub fn append(&self, transaction: Transaction) -> Result<(), LedgerError> {
        if transaction.status.is_terminal() {
            return Err(LedgerError::invalid_state(
                "append",
                format!(
                    "entry {} may not be created in terminal status {:?}",
                    transaction.id, transaction.status
                ),
            ));
        }
        if self.entries.contains_key(&transaction.id) {
            return Err(LedgerError::validation(format!(
                "transaction id {} already exists",
                transaction.id
            )));
        }
        let id = transaction.id;
        self.entries.insert(id, transaction);
        self.order
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(id);
        Ok(())
    }

    /// Fetch an entry by id
    pub fn get(&self, id: TransactionId) -> Option<Transaction> {
        self.entries.get(&id).map(|entry| entry.clone())
    }

    /// Move an entry to a new lifecycle status
    ///
    /// Rejects any transition the state machine does not allow; sets
    /// `processed_at` when the entry reaches `Completed`.
    pub fn transition(
        &self,
        id: TransactionId,
        to: TransactionStatus,
        now: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| LedgerError::transaction_not_found(id))?;
        let tx = entry.value_mut();

        if !tx.status.can_transition(to) {
            return Err(LedgerError::invalid_state(
                "transition",
                format!("transaction {} cannot move {:?} -> {:?}", id, tx.status, to),
            ));
        }

        tx.status = to;
        if to == TransactionStatus::Completed {
            tx.processed_at = Some(now);
        }
        debug!(transaction = id, status = ?to, "ledger transition");
        Ok(tx.clone())
    }

    /// Complete an entry: write balance snapshots and mark `Completed`
    ///
    /// Performed under the entry's own lock so no reader observes the
    /// snapshots without the terminal status or vice versa.
    pub fn complete(
        &self,
        id: TransactionId,
        snapshots: Snapshots,
        now: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| LedgerError::transaction_not_found(id))?;
        let tx = entry.value_mut();

        if !tx.status.can_transition(TransactionStatus::Completed) {
            return Err(LedgerError::invalid_state(
                "complete",
                format!(
                    "transaction {} cannot move {:?} -> Completed",
                    id, tx.status
                ),
            ));
        }

        tx.from_balance_before = snapshots.from_before;
        tx.from_balance_after = snapshots.from_after;
        tx.to_balance_before = snapshots.to_before;
        tx.to_balance_after = snapshots.to_after;
        tx.status = TransactionStatus::Completed;
        tx.processed_at = Some(now);
        debug!(transaction = id, "ledger entry completed");
        Ok(tx.clone())
    }

    /// Set or clear the administrative flag on an entry
    ///
    /// The only mutation permitted after an entry is terminal; it does not
    /// alter monetary facts. Single-writer per entry via the entry lock.
    pub fn annotate(
        &self,
        id: TransactionId,
        flagged: bool,
        reason: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        let mut entry = self
            .entries
            .get_mut(&id)
            .ok_or_else(|| LedgerError::transaction_not_found(id))?;
        let tx = entry.value_mut();
        tx.flagged = flagged;
        tx.flag_reason = reason;
        Ok(tx.clone())
    }

    /// Ledger history for one account, newest first
    ///
    /// Applies the filter criteria conjunctively, then the pagination
    /// window.
    pub fn history(
        &self,
        account_id: AccountId,
        filter: &HistoryFilter,
        page: Page,
    ) -> Vec<Transaction> {
        let order = self
            .order
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        order
            .iter()
            .rev()
            .filter_map(|id| self.entries.get(id).map(|entry| entry.clone()))
            .filter(|tx| tx.involves(account_id) && filter.matches(tx))
            .skip(page.offset)
            .take(page.limit)
            .collect()
    }

    /// Sum of completed or processing debits originated by the account
    /// with `created_at` inside `[start, end)`
    ///
    /// This is the aggregation input to the limit evaluator; fees count
    /// toward the debited total.
    pub fn debit_total_between(
        &self,
        account_id: AccountId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Decimal {
        self.entries
            .iter()
            .filter(|entry| {
                let tx = entry.value();
                tx.from_account == Some(account_id)
                    && matches!(
                        tx.status,
                        TransactionStatus::Completed | TransactionStatus::Processing
                    )
                    && tx.created_at >= start
                    && tx.created_at < end
            })
            .map(|entry| entry.value().amount + entry.value().fees.total)
            .sum()
    }

    /// Aggregated totals by type for one account and calendar month
    ///
    /// Only `Completed` entries are counted. `total_out` includes fees;
    /// read-side aggregation never feeds back into balances.
    pub fn monthly_summary(
        &self,
        account_id: AccountId,
        year: i32,
        month: u32,
    ) -> MonthlySummary {
        let mut total_in = Decimal::ZERO;
        let mut total_out = Decimal::ZERO;
        let mut total_fees = Decimal::ZERO;
        let mut count = 0usize;
        let mut per_type: Vec<(TransactionType, usize, Decimal)> = TransactionType::ALL
            .iter()
            .map(|t| (*t, 0usize, Decimal::ZERO))
            .collect();

        for entry in self.entries.iter() {
            let tx = entry.value();
            if tx.status != TransactionStatus::Completed || !tx.involves(account_id) {
                continue;
            }
            let created = tx.created_at;
            if created.year() != year || created.month() != month {
                continue;
            }

            count += 1;
            if tx.from_account == Some(account_id) {
                total_out += tx.amount + tx.fees.total;
                total_fees += tx.fees.total;
            }
            if tx.to_account == Some(account_id) {
                total_in += tx.amount;
            }
            if let Some(slot) = per_type.iter_mut().find(|(t, _, _)| *t == tx.tx_type) {
                slot.1 += 1;
                slot.2 += tx.amount;
            }
        }

        MonthlySummary {
            account_id,
            year,
            month,
            total_in,
            total_out,
            total_fees,
            count,
            by_type: per_type
                .into_iter()
                .filter(|(_, count, _)| *count > 0)
                .map(|(tx_type, count, total)| TypeTotal {
                    tx_type,
                    count,
                    total,
                })
                .collect(),
        }
    }

    /// Snapshot of every entry in insertion order, for replay output
    pub fn all_entries(&self) -> Vec<Transaction> {
        self.order
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter_map(|id| self.entries.get(id).map(|entry| entry.clone()))
            .collect()
    }
}

impl Default for TransactionLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// UTC day window `[start, end)` containing `at`
pub fn day_window(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = at.date_naive().and_time(chrono::NaiveTime::MIN).and_utc();
    (start, start + chrono::Duration::days(1))
}

/// UTC calendar-month window `[start, end)` containing `at`
pub fn month_window(at: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let (year, month) = (at.year(), at.month());
    let start = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .expect("first of month is always valid");
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .expect("first of month is always valid");
    (start, end)
}
