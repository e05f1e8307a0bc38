//! Transaction-related types for the ledger core
//!
//! This module defines the ledger entry structure, the closed enumerations
//! for transaction type, channel, status, and direction, and the transfer
//! request model consumed by the orchestrator.
//!
//! Status is a state machine, not a string: every transition goes through
//! [`TransactionStatus::can_transition`], so illegal moves (for example
//! `Completed -> Cancelled`) are rejected at the single place transitions
//! happen instead of silently defaulting somewhere downstream.

use crate::types::account::AccountId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Internal transaction identifier
pub type TransactionId = u64;

/// Currency code used when a request does not specify one
pub const DEFAULT_CURRENCY: &str = "PKR";

/// Transaction types recorded in the ledger
///
/// Adding a variant forces every consumer (fee policy, direction
/// classifier, limit evaluator, CSV surface) to handle it deliberately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Credit funds into an account; no source side
    Deposit,

    /// Debit funds out of an account; no destination side
    Withdrawal,

    /// Move funds between two accounts (or to an external recipient)
    Transfer,

    /// Debit in settlement of a bill or merchant obligation
    Payment,

    /// Institutional charge debited from an account
    Fee,

    /// Interest credited to an account
    Interest,

    /// Administrative reversal of a prior entry
    Reversal,

    /// Funds returned to an account
    Refund,
}

impl TransactionType {
    /// Every transaction type, in the fixed order used for aggregate output
    pub const ALL: [TransactionType; 8] = [
        TransactionType::Deposit,
        TransactionType::Withdrawal,
        TransactionType::Transfer,
        TransactionType::Payment,
        TransactionType::Fee,
        TransactionType::Interest,
        TransactionType::Reversal,
        TransactionType::Refund,
    ];
}

/// Channel through which a transaction was initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Online,
    Mobile,
    Atm,
    Branch,
}

/// Transaction lifecycle states
///
/// Legal transitions:
///
/// ```text
/// Pending -> Processing -> Completed
/// Pending -> Processing -> Failed
/// Pending -> Failed
/// Pending -> Cancelled
/// ```
///
/// `Completed`, `Failed`, and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    /// Whether a transition from `self` to `to` is legal
    ///
    /// Cancellation is only reachable from `Pending`; once processing has
    /// begun the entry can only complete or fail. No transition leaves a
    /// terminal state.
    pub fn can_transition(&self, to: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, to),
            (Pending, Processing)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
        )
    }

    /// Whether this status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Failed | TransactionStatus::Cancelled
        )
    }
}

/// Signed interpretation of a ledger entry from one account's point of view
///
/// Computed by the direction classifier for history and statement
/// rendering; never stored on the entry itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Debit,
    Credit,
    ExternalDebit,
    ExternalCredit,
    TransferSelf,
    ReversalSelf,
    Unknown,
}

/// Fee breakdown attached to a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub transaction_fee: Decimal,
    pub processing_fee: Decimal,
    pub other_charges: Decimal,
    pub total: Decimal,
}

impl FeeBreakdown {
    /// A breakdown with every component zero
    pub fn zero() -> Self {
        FeeBreakdown {
            transaction_fee: Decimal::ZERO,
            processing_fee: Decimal::ZERO,
            other_charges: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    /// Build a breakdown from components, deriving the total
    pub fn new(transaction_fee: Decimal, processing_fee: Decimal, other_charges: Decimal) -> Self {
        FeeBreakdown {
            transaction_fee,
            processing_fee,
            other_charges,
            total: transaction_fee + processing_fee + other_charges,
        }
    }
}

/// External recipient details for transfers leaving the institution
///
/// The claimed title is verified only by a loose case-insensitive
/// substring match against the resolved account; see the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRecipient {
    pub account_number: String,
    pub claimed_title: String,
}

/// Bill-payment metadata carried on `Payment` entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillDetails {
    pub biller_name: String,
    pub consumer_number: String,
}

/// Where a requested movement is headed
///
/// A tagged union rather than a pair of nullable fields: each variant
/// carries exactly the data its case requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Another account inside the institution
    Internal { account_id: AccountId },

    /// A third-party account identified by number plus claimed title
    External {
        account_number: String,
        claimed_title: String,
    },

    /// No destination side (withdrawals, cash deposits)
    None,
}

/// Kinds of movement the orchestrator accepts
///
/// A subset of [`TransactionType`]: fees, interest, reversals, and
/// refunds are written by internal processes, never requested directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Transfer,
    Payment,
    Withdrawal,
    Deposit,
}

impl TransferKind {
    /// The ledger transaction type this request kind produces
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            TransferKind::Transfer => TransactionType::Transfer,
            TransferKind::Payment => TransactionType::Payment,
            TransferKind::Withdrawal => TransactionType::Withdrawal,
            TransferKind::Deposit => TransactionType::Deposit,
        }
    }

    /// Whether this kind debits the requesting account
    pub fn is_debit(&self) -> bool {
        !matches!(self, TransferKind::Deposit)
    }
}

/// A requested money movement, as accepted by the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// What kind of movement is requested
    pub kind: TransferKind,

    /// The principal's account the operation acts on. Debited for
    /// transfers, payments, and withdrawals; credited for deposits.
    pub source_account_id: AccountId,

    /// Destination side, when one exists
    pub destination: Destination,

    /// Principal amount; must be strictly positive
    pub amount: Decimal,

    /// Currency code; entries are single-currency
    pub currency: String,

    /// Free-form description shown on statements
    pub description: String,

    /// Initiating channel
    pub channel: Channel,

    /// Free-form qualifier, e.g. `external_transfer` or `bill_payment`
    pub subtype: Option<String>,

    /// Bill metadata for payment requests
    pub bill: Option<BillDetails>,
}

/// A single ledger entry
///
/// Once `Completed` the monetary facts are immutable; only the
/// `flagged`/`flag_reason` annotation fields may change afterwards.
/// Balance snapshots are denormalized so audit queries are
/// self-contained without re-deriving history from the account store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Internal identifier
    pub id: TransactionId,

    /// Human-readable, time-ordered reference (`TXN-YYYYMMDD-NNNNNN`)
    pub reference: String,

    #[serde(rename = "type")]
    pub tx_type: TransactionType,

    pub subtype: Option<String>,

    /// Principal amount, exclusive of fees
    pub amount: Decimal,

    pub currency: String,

    pub description: String,

    pub channel: Channel,

    pub status: TransactionStatus,

    /// Debited account, absent for deposits
    pub from_account: Option<AccountId>,

    /// Credited account, absent for withdrawals and external transfers
    pub to_account: Option<AccountId>,

    /// Recipient details when the destination is outside the institution
    pub external_recipient: Option<ExternalRecipient>,

    /// Bill metadata on payment entries
    pub bill: Option<BillDetails>,

    pub from_balance_before: Option<Decimal>,
    pub from_balance_after: Option<Decimal>,
    pub to_balance_before: Option<Decimal>,
    pub to_balance_after: Option<Decimal>,

    pub fees: FeeBreakdown,

    /// Administrative annotation; does not alter monetary facts
    pub flagged: bool,
    pub flag_reason: Option<String>,

    pub created_at: DateTime<Utc>,

    /// Set when the entry reaches `Completed`
    pub processed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Whether the given account participates in this entry
    pub fn involves(&self, account_id: AccountId) -> bool {
        self.from_account == Some(account_id) || self.to_account == Some(account_id)
    }
}

/// Filters for ledger history queries
///
/// All criteria are optional and conjunctive.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub tx_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
}

impl HistoryFilter {
    /// Whether a ledger entry satisfies every set criterion
    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(from) = self.from {
            if tx.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if tx.created_at > to {
                return false;
            }
        }
        if let Some(tx_type) = self.tx_type {
            if tx.tx_type != tx_type {
                return false;
            }
        }
        if let Some(status) = self.status {
            if tx.status != status {
                return false;
            }
        }
        true
    }
}

/// Pagination window for history queries
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Page {
            offset: 0,
            limit: 50,
        }
    }
}

/// Per-type aggregate line in a monthly summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeTotal {
    pub tx_type: TransactionType,
    pub count: usize,
    pub total: Decimal,
}

/// Aggregated ledger totals for one account and calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub account_id: AccountId,
    pub year: i32,
    pub month: u32,

    /// Completed amounts credited to the account
    pub total_in: Decimal,

    /// Completed amounts debited from the account, fees included
    pub total_out: Decimal,

    /// Fees charged on entries this account originated
    pub total_fees: Decimal,

    /// Completed entry count
    pub count: usize,

    /// Per-type totals, ordered by type for deterministic output
    pub by_type: Vec<TypeTotal>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::pending_processing(TransactionStatus::Pending, TransactionStatus::Processing, true)]
    #[case::pending_failed(TransactionStatus::Pending, TransactionStatus::Failed, true)]
    #[case::pending_cancelled(TransactionStatus::Pending, TransactionStatus::Cancelled, true)]
    #[case::processing_completed(TransactionStatus::Processing, TransactionStatus::Completed, true)]
    #[case::processing_failed(TransactionStatus::Processing, TransactionStatus::Failed, true)]
    #[case::processing_cancelled(TransactionStatus::Processing, TransactionStatus::Cancelled, false)]
    #[case::pending_completed(TransactionStatus::Pending, TransactionStatus::Completed, false)]
    #[case::completed_cancelled(TransactionStatus::Completed, TransactionStatus::Cancelled, false)]
    #[case::completed_failed(TransactionStatus::Completed, TransactionStatus::Failed, false)]
    #[case::failed_completed(TransactionStatus::Failed, TransactionStatus::Completed, false)]
    #[case::cancelled_processing(TransactionStatus::Cancelled, TransactionStatus::Processing, false)]
    fn test_status_transitions(
        #[case] from: TransactionStatus,
        #[case] to: TransactionStatus,
        #[case] legal: bool,
    ) {
        assert_eq!(from.can_transition(to), legal);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(!TransactionStatus::Processing.is_terminal());
        assert!(TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Failed.is_terminal());
        assert!(TransactionStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_fee_breakdown_derives_total() {
        let fees = FeeBreakdown::new(
            Decimal::from(25),
            Decimal::from(5),
            Decimal::ZERO,
        );
        assert_eq!(fees.total, Decimal::from(30));
        assert_eq!(FeeBreakdown::zero().total, Decimal::ZERO);
    }

    #[rstest]
    #[case::transfer(TransferKind::Transfer, TransactionType::Transfer, true)]
    #[case::payment(TransferKind::Payment, TransactionType::Payment, true)]
    #[case::withdrawal(TransferKind::Withdrawal, TransactionType::Withdrawal, true)]
    #[case::deposit(TransferKind::Deposit, TransactionType::Deposit, false)]
    fn test_transfer_kind_mapping(
        #[case] kind: TransferKind,
        #[case] tx_type: TransactionType,
        #[case] debits: bool,
    ) {
        assert_eq!(kind.transaction_type(), tx_type);
        assert_eq!(kind.is_debit(), debits);
    }
}
