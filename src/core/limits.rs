//! Limit evaluator: daily and monthly debit ceilings
//!
//! Usage is derived from the ledger: every `Completed` or `Processing`
//! entry debiting the account inside the window counts, fees included.
//! Window boundaries are fixed at UTC day and calendar-month edges for
//! determinism.

use crate::core::ledger::{day_window, month_window, TransactionLedger};
use crate::types::{Account, LedgerError, LimitWindow};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Outcome of a limit evaluation
///
/// When `allowed` is false, `exceeds_by` is the exact shortfall of the
/// reported window, so callers can render a corrective amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitCheck {
    pub allowed: bool,

    /// The window reported: the binding one on success, the more
    /// restrictive failing one on refusal
    pub window: LimitWindow,

    /// Debits already counted in the reported window
    pub used: Decimal,

    /// Ceiling of the reported window
    pub limit: Decimal,

    /// Headroom left in the reported window before the proposed debit
    pub remaining: Decimal,

    /// Amount by which `used + proposed` overshoots `limit`; zero when
    /// allowed
    pub exceeds_by: Decimal,
}

/// Evaluates daily and monthly debit ceilings against ledger history
pub struct LimitEvaluator {
    ledger: Arc<TransactionLedger>,
}

impl LimitEvaluator {
    /// Create an evaluator reading usage from the given ledger
    pub fn new(ledger: Arc<TransactionLedger>) -> Self {
        LimitEvaluator { ledger }
    }

    /// Decide whether the account may be debited by `amount` at `now`
    ///
    /// Both the daily and the monthly window must pass; when both fail,
    /// the window with the larger shortfall is reported. Fixed-deposit
    /// accounts are refused categorically, regardless of their configured
    /// limit values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for fixed-deposit accounts; numeric limit
    /// breaches are reported in the returned [`LimitCheck`], not as
    /// errors.
    pub fn can_debit(
        &self,
        account: &Account,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<LimitCheck, LedgerError> {
        if !account.account_type.debits_permitted() {
            return Err(LedgerError::invalid_state(
                "debit",
                format!(
                    "account {} is a fixed deposit; debits are not permitted",
                    account.id
                ),
            ));
        }

        let (day_start, day_end) = day_window(now);
        let daily_used = self.ledger.debit_total_between(account.id, day_start, day_end);
        let daily = window_check(
            LimitWindow::Daily,
            daily_used,
            account.daily_limit,
            amount,
        );

        let (month_start, month_end) = month_window(now);
        let monthly_used = self
            .ledger
            .debit_total_between(account.id, month_start, month_end);
        let monthly = window_check(
            LimitWindow::Monthly,
            monthly_used,
            account.monthly_limit,
            amount,
        );

        Ok(match (daily.allowed, monthly.allowed) {
            (true, true) => daily,
            (false, true) => daily,
            (true, false) => monthly,
            // both breached: report the larger shortfall
            (false, false) => {
                if monthly.exceeds_by > daily.exceeds_by {
                    monthly
                } else {
                    daily
                }
            }
        })
    }
}

fn window_check(
    window: LimitWindow,
    used: Decimal,
    limit: Decimal,
    amount: Decimal,
) -> LimitCheck {
    let total = used + amount;
    let allowed = total <= limit;
    LimitCheck {
        allowed,
        window,
        used,
        limit,
        remaining: (limit - used).max(Decimal::ZERO),
        exceeds_by: if allowed {
            Decimal::ZERO
        } else {
            total - limit
        },
    }
}
