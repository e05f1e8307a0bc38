//! Error types for the ledger core
//!
//! This module defines the full error taxonomy of the transaction-processing
//! core. Every kind maps to a distinct, user-presentable failure; limit and
//! fund errors carry enough structured data for a caller to suggest a
//! corrective amount.
//!
//! # Propagation policy
//!
//! All precondition failures are detected and reported before any mutation.
//! Only infrastructure failures inside the atomic commit produce
//! `CommitFailure`, and those are always accompanied by a ledger entry left
//! in the terminal `Failed` state.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// The limit window that was breached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitWindow {
    Daily,
    Monthly,
}

impl std::fmt::Display for LimitWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitWindow::Daily => write!(f, "daily"),
            LimitWindow::Monthly => write!(f, "monthly"),
        }
    }
}

/// Main error type for the ledger core
///
/// Each variant includes the context needed to diagnose the failure and to
/// render a precise user-facing message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// An account or transaction id did not resolve
    #[error("{resource} {id} not found")]
    NotFound {
        /// Resource category, e.g. "account" or "transaction"
        resource: &'static str,
        /// The identifier that failed to resolve
        id: String,
    },

    /// The principal does not own or participate in the resource
    #[error("principal {principal} is not authorized for {resource} {id}")]
    Unauthorized {
        principal: u64,
        resource: &'static str,
        id: String,
    },

    /// The action is invalid for the resource's current status
    #[error("invalid state for {action}: {detail}")]
    InvalidState {
        /// The attempted action, e.g. "debit" or "cancel"
        action: &'static str,
        /// Human-readable explanation of the refusal
        detail: String,
    },

    /// A debit would breach the account's minimum-balance floor
    #[error(
        "insufficient funds on account {account}: balance {balance}, minimum {minimum_balance}, requested {requested}"
    )]
    InsufficientFunds {
        account: u64,
        balance: Decimal,
        minimum_balance: Decimal,
        requested: Decimal,
    },

    /// A daily or monthly debit ceiling would be breached
    ///
    /// `exceeds_by` is the exact shortfall, so the caller can render
    /// actionable text ("reduce the amount by ...").
    #[error(
        "{window} limit exceeded on account {account}: used {used}, limit {limit}, over by {exceeds_by}"
    )]
    LimitExceeded {
        account: u64,
        window: LimitWindow,
        used: Decimal,
        limit: Decimal,
        exceeds_by: Decimal,
    },

    /// A third-party transfer's claimed recipient title failed the
    /// fuzzy-match check against the resolved account title
    #[error("recipient title '{claimed}' does not match account {account_number}")]
    RecipientMismatch {
        account_number: String,
        claimed: String,
    },

    /// The request itself is malformed
    #[error("validation failed: {message}")]
    ValidationError { message: String },

    /// Optimistic concurrency check failed on a balance write
    ///
    /// Indicates another writer got in between the read and the write.
    /// Inside the orchestrator's lock discipline this is unreachable; it
    /// exists so any write that escapes the discipline is rejected
    /// rather than lost.
    #[error("version conflict on account {account}: expected {expected}, found {actual}")]
    Conflict {
        account: u64,
        expected: u64,
        actual: u64,
    },

    /// The atomic balance/ledger commit failed after the entry was created
    ///
    /// The entry has been marked `Failed` and no balance change remains
    /// applied; the request is retryable by resubmission.
    #[error("commit failed for transaction {transaction}: {reason}")]
    CommitFailure { transaction: u64, reason: String },
}

// Helper constructors for the common kinds

impl LedgerError {
    /// Create a NotFound error for an account id
    pub fn account_not_found(id: u64) -> Self {
        LedgerError::NotFound {
            resource: "account",
            id: id.to_string(),
        }
    }

    /// Create a NotFound error for an account number
    pub fn account_number_not_found(number: &str) -> Self {
        LedgerError::NotFound {
            resource: "account",
            id: number.to_string(),
        }
    }

    /// Create a NotFound error for a transaction id
    pub fn transaction_not_found(id: u64) -> Self {
        LedgerError::NotFound {
            resource: "transaction",
            id: id.to_string(),
        }
    }

    /// Create an Unauthorized error
    pub fn unauthorized(principal: u64, resource: &'static str, id: u64) -> Self {
        LedgerError::Unauthorized {
            principal,
            resource,
            id: id.to_string(),
        }
    }

    /// Create an InvalidState error
    pub fn invalid_state(action: &'static str, detail: impl Into<String>) -> Self {
        LedgerError::InvalidState {
            action,
            detail: detail.into(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(
        account: u64,
        balance: Decimal,
        minimum_balance: Decimal,
        requested: Decimal,
    ) -> Self {
        LedgerError::InsufficientFunds {
            account,
            balance,
            minimum_balance,
            requested,
        }
    }

    /// Create a LimitExceeded error
    pub fn limit_exceeded(
        account: u64,
        window: LimitWindow,
        used: Decimal,
        limit: Decimal,
        exceeds_by: Decimal,
    ) -> Self {
        LedgerError::LimitExceeded {
            account,
            window,
            used,
            limit,
            exceeds_by,
        }
    }

    /// Create a RecipientMismatch error
    pub fn recipient_mismatch(account_number: &str, claimed: &str) -> Self {
        LedgerError::RecipientMismatch {
            account_number: account_number.to_string(),
            claimed: claimed.to_string(),
        }
    }

    /// Create a ValidationError
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::ValidationError {
            message: message.into(),
        }
    }

    /// Create a Conflict error
    pub fn conflict(account: u64, expected: u64, actual: u64) -> Self {
        LedgerError::Conflict {
            account,
            expected,
            actual,
        }
    }

    /// Create a CommitFailure error
    pub fn commit_failure(transaction: u64, reason: impl Into<String>) -> Self {
        LedgerError::CommitFailure {
            transaction,
            reason: reason.into(),
        }
    }
}
