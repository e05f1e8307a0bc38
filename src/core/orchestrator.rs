//! Transfer orchestrator: validation, locking, and the atomic commit
//!
//! The orchestrator is the only writer of balances and the only creator of
//! ledger entries. A request flows through the precondition chain in a
//! fixed order (first failure wins, each failure a distinct error kind),
//! then through an atomic commit unit: ledger entry to `Processing`, debit,
//! credit, balance snapshots, `Completed`. Any failure after the entry
//! exists compensates the applied deltas under the held locks and leaves
//! the entry `Failed`; no partial application is ever observable.
//!
//! # Locking
//!
//! Per-account mutexes are taken in ascending account-id order and held
//! across the minimum-balance check, the limit evaluation, and every
//! balance mutation. Two transfers touching the same accounts therefore
//! serialize, and opposite-direction transfers cannot deadlock.

use crate::core::account_store::AccountStore;
use crate::core::fees::{FeePolicy, SUBTYPE_EXTERNAL_TRANSFER};
use crate::core::ledger::{Snapshots, TransactionLedger};
use crate::core::limits::LimitEvaluator;
use crate::core::traits::{NotificationEvent, Notifier};
use crate::types::account::Principal;
use crate::types::{
    Account, Destination, ExternalRecipient, FeeBreakdown, LedgerError, Transaction,
    TransactionId, TransactionStatus, TransferKind, TransferRequest,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Destination after resolution against the account store
enum Resolved {
    /// Another account inside the institution
    Internal(Account),

    /// A third-party account resolved by number; keeps the claimed
    /// recipient details for the ledger entry
    External {
        account: Account,
        recipient: ExternalRecipient,
    },

    /// No destination side
    None,
}

impl Resolved {
    fn internal_account(&self) -> Option<&Account> {
        match self {
            Resolved::Internal(account) | Resolved::External { account, .. } => Some(account),
            Resolved::None => None,
        }
    }

    fn recipient(&self) -> Option<ExternalRecipient> {
        match self {
            Resolved::External { recipient, .. } => Some(recipient.clone()),
            _ => None,
        }
    }
}

/// Orchestrates money movements across the account store and the ledger
pub struct TransferOrchestrator {
    accounts: Arc<AccountStore>,
    ledger: Arc<TransactionLedger>,
    limits: LimitEvaluator,
    fees: FeePolicy,
    notifier: Arc<dyn Notifier>,
}

impl TransferOrchestrator {
    /// Create an orchestrator over shared store components
    pub fn new(
        accounts: Arc<AccountStore>,
        ledger: Arc<TransactionLedger>,
        fees: FeePolicy,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let limits = LimitEvaluator::new(ledger.clone());
        TransferOrchestrator {
            accounts,
            ledger,
            limits,
            fees,
            notifier,
        }
    }

    /// Execute a requested money movement
    ///
    /// Preconditions are checked in a fixed order before any mutation:
    ///
    /// 1. the source account exists and belongs to the principal
    /// 2. the source account is `Active`
    /// 3. for third-party transfers, the destination resolves and the
    ///    claimed title passes the fuzzy match
    /// 4. the debit (principal + fee) keeps the balance at or above the
    ///    minimum
    /// 5. the limit evaluator passes for principal + fee
    ///
    /// On success the completed ledger entry is returned and notifications
    /// are dispatched fire-and-forget, outside the critical section.
    pub fn execute(
        &self,
        principal: &Principal,
        request: TransferRequest,
    ) -> Result<Transaction, LedgerError> {
        validate_request(&request)?;

        let source = self.accounts.load(request.source_account_id)?;
        if !principal.can_act_for(&source) {
            return Err(LedgerError::unauthorized(
                principal.user_id,
                "account",
                source.id,
            ));
        }
        if !source.is_active() {
            return Err(LedgerError::invalid_state(
                "transfer",
                format!("account {} is {:?}", source.id, source.status),
            ));
        }

        let destination = self.resolve_destination(&request)?;

        // external transfers are marked even when the caller omitted the
        // qualifier, so fees and direction upgrades apply uniformly
        let subtype = match (&destination, &request.subtype) {
            (Resolved::External { .. }, None) => Some(SUBTYPE_EXTERNAL_TRANSFER.to_string()),
            (_, subtype) => subtype.clone(),
        };
        let tx_type = request.kind.transaction_type();
        let fees = if request.kind.is_debit() {
            self.fees.compute_fees(tx_type, subtype.as_deref())
        } else {
            FeeBreakdown::zero()
        };

        let completed = {
            // ascending-id lock order over every account touched
            let mut lock_ids = vec![source.id];
            if let Some(dest) = destination.internal_account() {
                if dest.id != source.id {
                    lock_ids.push(dest.id);
                }
            }
            lock_ids.sort_unstable();
            let handles: Vec<_> = lock_ids
                .iter()
                .map(|id| self.accounts.lock_handle(*id))
                .collect();
            let _guards: Vec<_> = handles
                .iter()
                .map(|handle| handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
                .collect();

            // fresh snapshots now that we hold the locks
            let source = self.accounts.load(source.id)?;
            if !source.is_active() {
                return Err(LedgerError::invalid_state(
                    "transfer",
                    format!("account {} is {:?}", source.id, source.status),
                ));
            }
            let dest_account = match destination.internal_account() {
                Some(dest) => Some(self.accounts.load(dest.id)?),
                None => None,
            };

            let now = Utc::now();
            let debit_total = request.amount + fees.total;

            if request.kind.is_debit() {
                if source.balance - debit_total < source.minimum_balance {
                    return Err(LedgerError::insufficient_funds(
                        source.id,
                        source.balance,
                        source.minimum_balance,
                        debit_total,
                    ));
                }
                let check = self.limits.can_debit(&source, debit_total, now)?;
                if !check.allowed {
                    return Err(LedgerError::limit_exceeded(
                        source.id,
                        check.window,
                        check.used,
                        check.limit,
                        check.exceeds_by,
                    ));
                }
            }

            let (from_account, to_account) = match request.kind {
                TransferKind::Deposit => (None, Some(source.id)),
                TransferKind::Withdrawal => (Some(source.id), None),
                TransferKind::Transfer | TransferKind::Payment => (
                    Some(source.id),
                    dest_account.as_ref().map(|account| account.id),
                ),
            };

            let (id, reference) = self.ledger.allocate(now);
            self.ledger.append(Transaction {
                id,
                reference,
                tx_type,
                subtype,
                amount: request.amount,
                currency: request.currency.clone(),
                description: request.description.clone(),
                channel: request.channel,
                status: TransactionStatus::Pending,
                from_account,
                to_account,
                external_recipient: destination.recipient(),
                bill: request.bill.clone(),
                from_balance_before: None,
                from_balance_after: None,
                to_balance_before: None,
                to_balance_after: None,
                fees,
                flagged: false,
                flag_reason: None,
                created_at: now,
                processed_at: None,
            })?;
            self.ledger
                .transition(id, TransactionStatus::Processing, now)?;

            self.commit(id, &request, &source, dest_account.as_ref(), debit_total, now)?
        };

        debug!(
            transaction = completed.id,
            reference = %completed.reference,
            amount = %completed.amount,
            "transfer committed"
        );
        self.dispatch_notifications(&completed, &source, destination.internal_account());
        Ok(completed)
    }

    /// Cancel a pending transaction
    ///
    /// Only participants (or an admin) may cancel, and only while the
    /// entry is still `Pending`; once processing has begun the request is
    /// refused.
    pub fn cancel(
        &self,
        principal: &Principal,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        let tx = self
            .ledger
            .get(transaction_id)
            .ok_or_else(|| LedgerError::transaction_not_found(transaction_id))?;
        self.authorize_participant(principal, &tx)?;

        let cancelled = self
            .ledger
            .transition(transaction_id, TransactionStatus::Cancelled, Utc::now())?;
        self.notifier.notify(
            principal.user_id,
            NotificationEvent::TransferCancelled {
                transaction: cancelled.id,
                reference: cancelled.reference.clone(),
            },
        );
        Ok(cancelled)
    }

    /// Check that the principal participates in the entry (or is admin)
    pub fn authorize_participant(
        &self,
        principal: &Principal,
        tx: &Transaction,
    ) -> Result<(), LedgerError> {
        if principal.admin {
            return Ok(());
        }
        for account_id in [tx.from_account, tx.to_account].into_iter().flatten() {
            if let Ok(account) = self.accounts.load(account_id) {
                if account.user_id == principal.user_id {
                    return Ok(());
                }
            }
        }
        Err(LedgerError::Unauthorized {
            principal: principal.user_id,
            resource: "transaction",
            id: tx.id.to_string(),
        })
    }

    fn resolve_destination(&self, request: &TransferRequest) -> Result<Resolved, LedgerError> {
        match &request.destination {
            Destination::Internal { account_id } => {
                Ok(Resolved::Internal(self.accounts.load(*account_id)?))
            }
            Destination::External {
                account_number,
                claimed_title,
            } => {
                let account = self.accounts.load_by_account_number(account_number)?;
                if !titles_match(claimed_title, &account.title) {
                    return Err(LedgerError::recipient_mismatch(
                        account_number,
                        claimed_title,
                    ));
                }
                Ok(Resolved::External {
                    account,
                    recipient: ExternalRecipient {
                        account_number: account_number.clone(),
                        claimed_title: claimed_title.clone(),
                    },
                })
            }
            Destination::None => Ok(Resolved::None),
        }
    }

    /// The atomic unit: debit, credit, snapshots, `Completed`
    ///
    /// Runs entirely under the account locks taken by `execute`. Every
    /// failure path compensates whatever was applied and leaves the entry
    /// `Failed` before surfacing `CommitFailure`.
    fn commit(
        &self,
        id: TransactionId,
        request: &TransferRequest,
        source: &Account,
        dest: Option<&Account>,
        debit_total: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        if request.kind == TransferKind::Deposit {
            let to_before = source.balance;
            return match self
                .accounts
                .apply_delta(source.id, request.amount, source.version)
            {
                Ok(credited) => self.ledger.complete(
                    id,
                    Snapshots {
                        from_before: None,
                        from_after: None,
                        to_before: Some(to_before),
                        to_after: Some(credited.balance),
                    },
                    now,
                ),
                Err(cause) => self.fail(id, cause, now),
            };
        }

        let from_before = source.balance;
        let debited = match self
            .accounts
            .apply_delta(source.id, -debit_total, source.version)
        {
            Ok(debited) => debited,
            Err(cause) => return self.fail(id, cause, now),
        };

        let Some(dest) = dest else {
            // withdrawal or payment without an in-system destination
            return self.ledger.complete(
                id,
                Snapshots {
                    from_before: Some(from_before),
                    from_after: Some(debited.balance),
                    to_before: None,
                    to_after: None,
                },
                now,
            );
        };

        // a self-transfer credits the account we just debited, so the
        // snapshot and version come from the debited state
        let (to_before, dest_version) = if dest.id == source.id {
            (debited.balance, debited.version)
        } else {
            (dest.balance, dest.version)
        };

        match self
            .accounts
            .apply_delta(dest.id, request.amount, dest_version)
        {
            Ok(credited) => self.ledger.complete(
                id,
                Snapshots {
                    from_before: Some(from_before),
                    from_after: Some(debited.balance),
                    to_before: Some(to_before),
                    to_after: Some(credited.balance),
                },
                now,
            ),
            Err(cause) => {
                if let Err(compensation) =
                    self.accounts
                        .apply_delta(source.id, debit_total, debited.version)
                {
                    // the locks are still held, so this should be
                    // unreachable; if it happens the ledger entry still
                    // ends Failed and the discrepancy is loud
                    error!(
                        transaction = id,
                        account = source.id,
                        %compensation,
                        "failed to compensate debit after credit failure"
                    );
                }
                self.fail(id, cause, now)
            }
        }
    }

    /// Mark the entry `Failed` and surface the cause as `CommitFailure`
    fn fail(
        &self,
        id: TransactionId,
        cause: LedgerError,
        now: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        warn!(transaction = id, %cause, "commit failed; entry marked failed");
        if let Err(transition) = self.ledger.transition(id, TransactionStatus::Failed, now) {
            error!(transaction = id, %transition, "could not mark entry failed");
        }
        Err(LedgerError::commit_failure(id, cause.to_string()))
    }

    fn dispatch_notifications(
        &self,
        completed: &Transaction,
        source: &Account,
        dest: Option<&Account>,
    ) {
        self.notifier.notify(
            source.user_id,
            NotificationEvent::TransferCompleted {
                transaction: completed.id,
                reference: completed.reference.clone(),
                amount: completed.amount,
            },
        );
        if let Some(dest) = dest {
            if dest.user_id != source.user_id {
                self.notifier.notify(
                    dest.user_id,
                    NotificationEvent::FundsReceived {
                        transaction: completed.id,
                        reference: completed.reference.clone(),
                        amount: completed.amount,
                    },
                );
            }
        }
    }
}

/// Structural validation of a request, before any store access
fn validate_request(request: &TransferRequest) -> Result<(), LedgerError> {
    if request.amount <= Decimal::ZERO {
        return Err(LedgerError::validation("amount must be positive"));
    }
    if request.currency.trim().is_empty() {
        return Err(LedgerError::validation("currency must not be empty"));
    }
    match (request.kind, &request.destination) {
        (TransferKind::Transfer, Destination::None) => Err(LedgerError::validation(
            "transfer requires a destination",
        )),
        (TransferKind::Withdrawal | TransferKind::Deposit, destination)
            if *destination != Destination::None =>
        {
            Err(LedgerError::validation(
                "withdrawals and deposits take no destination",
            ))
        }
        _ => Ok(()),
    }
}

/// The deliberately loose recipient-title check for third-party transfers
///
/// Case-insensitive substring match in either direction. This mirrors the
/// observed anti-fraud control; it is not identity verification.
fn titles_match(claimed: &str, actual: &str) -> bool {
    let claimed = claimed.trim().to_lowercase();
    let actual = actual.trim().to_lowercase();
    if claimed.is_empty() || actual.is_empty() {
        return false;
    }
    actual.contains(&claimed) || claimed.contains(&actual)
}
