//! Direction classifier: debit/credit semantics from one account's view
//!
//! A pure read-side function used when rendering history and statements.
//! The precedence of the rules matters: the participant checks come before
//! the type-based defaults so that, for example, a reversal of a debit is
//! classified as a credit to the affected account rather than by its type.

use crate::core::fees::SUBTYPE_EXTERNAL_TRANSFER;
use crate::types::account::AccountId;
use crate::types::{Direction, Transaction, TransactionType};

/// Classify a ledger entry from the observing account's point of view
///
/// Precedence, evaluated top to bottom:
///
/// 1. both sides are the observer -> `TransferSelf` (`ReversalSelf` for
///    reversals)
/// 2. observer is the source -> `Debit`, upgraded to `ExternalDebit` for
///    the `external_transfer` subtype
/// 3. observer is the destination -> `Credit`, upgraded to
///    `ExternalCredit` likewise
/// 4. otherwise a fixed table keyed by transaction type, falling back to
///    `Unknown`
pub fn classify(transaction: &Transaction, observing: AccountId) -> Direction {
    let observer = Some(observing);
    let external = transaction.subtype.as_deref() == Some(SUBTYPE_EXTERNAL_TRANSFER);

    if transaction.from_account == observer && transaction.to_account == observer {
        return if transaction.tx_type == TransactionType::Reversal {
            Direction::ReversalSelf
        } else {
            Direction::TransferSelf
        };
    }

    if transaction.from_account == observer {
        return if external {
            Direction::ExternalDebit
        } else {
            Direction::Debit
        };
    }

    if transaction.to_account == observer {
        return if external {
            Direction::ExternalCredit
        } else {
            Direction::Credit
        };
    }

    match transaction.tx_type {
        TransactionType::Deposit => Direction::Credit,
        TransactionType::Withdrawal => Direction::Debit,
        TransactionType::Fee => Direction::Debit,
        TransactionType::Interest => Direction::Credit,
        TransactionType::Refund => Direction::Credit,
        TransactionType::Payment => Direction::Debit,
        TransactionType::Transfer | TransactionType::Reversal => Direction::Unknown,
    }
}
