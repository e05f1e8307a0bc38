//! Types module
//!
//! Contains core data structures used throughout the crate, organized into
//! logical submodules:
//! - `account`: account state, product types, and status lifecycle
//! - `transaction`: ledger entries, requests, and the status state machine
//! - `error`: the error taxonomy of the transaction-processing core

pub mod account;
pub mod error;
pub mod transaction;

pub use account::{Account, AccountId, AccountStatus, AccountType, UserId};
pub use error::{LedgerError, LimitWindow};
pub use transaction::{
    BillDetails, Channel, Destination, Direction, ExternalRecipient, FeeBreakdown, HistoryFilter,
    MonthlySummary, Page, Transaction, TransactionId, TransactionStatus, TransactionType,
    TransferKind, TransferRequest, TypeTotal, DEFAULT_CURRENCY,
};
