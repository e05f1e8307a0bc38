//! Banking service facade: the boundary exposed to callers
//!
//! Performs the capability check once per call (owner-or-admin), then
//! delegates to the orchestrator and the read-side components. Account
//! opening and status administration live here, outside the orchestrator,
//! but route every balance change through the same store contract.

use crate::core::account_store::AccountStore;
use crate::core::direction::classify;
use crate::core::fees::FeePolicy;
use crate::core::ledger::TransactionLedger;
use crate::core::orchestrator::TransferOrchestrator;
use crate::core::traits::Notifier;
use crate::types::account::{AccountId, Principal, UserId};
use crate::types::{
    Account, AccountStatus, AccountType, Channel, Destination, Direction, HistoryFilter,
    LedgerError, MonthlySummary, Page, Transaction, TransactionId, TransferKind,
    TransferRequest, DEFAULT_CURRENCY,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Base from which 12-digit account numbers are generated
const ACCOUNT_NUMBER_BASE: u64 = 100_000_000_000;

/// Facade over the ledger core
///
/// Callers share the service behind an `Arc`; the replay drivers do
/// exactly that.
pub struct BankingService {
    accounts: Arc<AccountStore>,
    ledger: Arc<TransactionLedger>,
    orchestrator: TransferOrchestrator,
    next_account_id: AtomicU64,
}

impl BankingService {
    /// Create a service with the standard fee policy
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self::with_policy(FeePolicy::standard(), notifier)
    }

    /// Create a service with a custom fee policy
    pub fn with_policy(fees: FeePolicy, notifier: Arc<dyn Notifier>) -> Self {
        let accounts = Arc::new(AccountStore::new());
        let ledger = Arc::new(TransactionLedger::new());
        let orchestrator =
            TransferOrchestrator::new(accounts.clone(), ledger.clone(), fees, notifier);
        BankingService {
            accounts,
            ledger,
            orchestrator,
            next_account_id: AtomicU64::new(1),
        }
    }

    /// Open an account for a user and record the opening deposit
    ///
    /// The account number is system-generated. A zero opening deposit is
    /// accepted and simply produces no ledger entry, since ledger amounts
    /// are strictly positive.
    pub fn open_account(
        &self,
        user_id: UserId,
        account_type: AccountType,
        title: impl Into<String>,
        opening_deposit: Decimal,
        channel: Channel,
    ) -> Result<Account, LedgerError> {
        if opening_deposit < Decimal::ZERO {
            return Err(LedgerError::validation(
                "opening deposit must not be negative",
            ));
        }

        let id = self.next_account_id.fetch_add(1, Ordering::SeqCst);
        let account_number = format!("{:012}", ACCOUNT_NUMBER_BASE + id);
        let account = Account::open(
            id,
            account_number,
            user_id,
            account_type,
            title.into(),
            Utc::now(),
        );
        self.accounts.insert(account.clone())?;
        info!(
            account = id,
            user = user_id,
            account_type = ?account_type,
            "account opened"
        );

        if opening_deposit > Decimal::ZERO {
            self.orchestrator.execute(
                &Principal::customer(user_id),
                TransferRequest {
                    kind: TransferKind::Deposit,
                    source_account_id: id,
                    destination: Destination::None,
                    amount: opening_deposit,
                    currency: DEFAULT_CURRENCY.to_string(),
                    description: "opening deposit".to_string(),
                    channel,
                    subtype: Some("opening_deposit".to_string()),
                    bill: None,
                },
            )?;
        }

        self.accounts.load(id)
    }

    /// Close an account; the balance must be zero
    pub fn close_account(
        &self,
        principal: &Principal,
        account_id: AccountId,
    ) -> Result<Account, LedgerError> {
        let account = self.authorized_account(principal, account_id)?;
        let closed = self.accounts.set_status(account.id, AccountStatus::Closed)?;
        info!(account = account_id, "account closed");
        Ok(closed)
    }

    /// Administrative status change (freeze, unfreeze, deactivate)
    ///
    /// Admin-only; closure goes through [`BankingService::close_account`]
    /// so the zero-balance rule is stated once.
    pub fn set_account_status(
        &self,
        principal: &Principal,
        account_id: AccountId,
        status: AccountStatus,
    ) -> Result<Account, LedgerError> {
        if !principal.admin {
            return Err(LedgerError::unauthorized(
                principal.user_id,
                "account",
                account_id,
            ));
        }
        if status == AccountStatus::Closed {
            return self.close_account(principal, account_id);
        }
        self.accounts.set_status(account_id, status)
    }

    /// Execute a requested money movement
    pub fn create_transfer(
        &self,
        principal: &Principal,
        request: TransferRequest,
    ) -> Result<Transaction, LedgerError> {
        self.orchestrator.execute(principal, request)
    }

    /// Fetch a transaction; only participants (or an admin) may read it
    pub fn get_transaction(
        &self,
        principal: &Principal,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        let tx = self
            .ledger
            .get(transaction_id)
            .ok_or_else(|| LedgerError::transaction_not_found(transaction_id))?;
        self.orchestrator.authorize_participant(principal, &tx)?;
        Ok(tx)
    }

    /// Account history, newest first, each entry paired with its direction
    /// from the account's point of view
    pub fn account_history(
        &self,
        principal: &Principal,
        account_id: AccountId,
        filter: &HistoryFilter,
        page: Page,
    ) -> Result<Vec<(Transaction, Direction)>, LedgerError> {
        self.authorized_account(principal, account_id)?;
        Ok(self
            .ledger
            .history(account_id, filter, page)
            .into_iter()
            .map(|tx| {
                let direction = classify(&tx, account_id);
                (tx, direction)
            })
            .collect())
    }

    /// Aggregated totals for one account and calendar month
    pub fn monthly_summary(
        &self,
        principal: &Principal,
        account_id: AccountId,
        year: i32,
        month: u32,
    ) -> Result<MonthlySummary, LedgerError> {
        self.authorized_account(principal, account_id)?;
        Ok(self.ledger.monthly_summary(account_id, year, month))
    }

    /// Flag or unflag a transaction for review
    ///
    /// Admin-only. The annotation is the only permitted mutation of a
    /// terminal ledger entry and never alters monetary facts.
    pub fn flag_transaction(
        &self,
        principal: &Principal,
        transaction_id: TransactionId,
        flagged: bool,
        reason: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        if !principal.admin {
            return Err(LedgerError::Unauthorized {
                principal: principal.user_id,
                resource: "transaction",
                id: transaction_id.to_string(),
            });
        }
        self.ledger.annotate(transaction_id, flagged, reason)
    }

    /// Cancel a pending transaction
    pub fn cancel_transaction(
        &self,
        principal: &Principal,
        transaction_id: TransactionId,
    ) -> Result<Transaction, LedgerError> {
        self.orchestrator.cancel(principal, transaction_id)
    }

    /// Load an account the principal may act on
    pub fn get_account(
        &self,
        principal: &Principal,
        account_id: AccountId,
    ) -> Result<Account, LedgerError> {
        self.authorized_account(principal, account_id)
    }

    /// Snapshot of all accounts, for replay output
    pub fn all_accounts(&self) -> Vec<Account> {
        self.accounts.all_accounts()
    }

    /// Snapshot of the full ledger in insertion order, for replay output
    pub fn all_entries(&self) -> Vec<Transaction> {
        self.ledger.all_entries()
    }

    fn authorized_account(
        &self,
        principal: &Principal,
        account_id: AccountId,
    ) -> Result<Account, LedgerError> {
        let account = self.accounts.load(account_id)?;
        if !principal.can_act_for(&account) {
            return Err(LedgerError::unauthorized(
                principal.user_id,
                "account",
                account_id,
            ));
        }
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::NoopNotifier;
    use crate::types::TransactionType;

    fn service() -> BankingService {
        BankingService::new(Arc::new(NoopNotifier))
    }

    #[test]
    fn test_open_account_records_opening_deposit() {
        let service = service();
        let account = service
            .open_account(
                10,
                AccountType::Savings,
                "Amina Yusuf",
                Decimal::from(5_000),
                Channel::Branch,
            )
            .unwrap();

        assert_eq!(account.balance, Decimal::from(5_000));
        assert_eq!(account.account_number.len(), 12);

        let history = service
            .account_history(
                &Principal::customer(10),
                account.id,
                &HistoryFilter::default(),
                Page::default(),
            )
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].0.tx_type, TransactionType::Deposit);
        assert_eq!(history[0].1, Direction::Credit);
    }

    #[test]
    fn test_open_account_with_zero_deposit_has_no_entry() {
        let service = service();
        let account = service
            .open_account(
                10,
                AccountType::Salary,
                "Amina Yusuf",
                Decimal::ZERO,
                Channel::Branch,
            )
            .unwrap();
        assert_eq!(account.balance, Decimal::ZERO);
        assert!(service.all_entries().is_empty());
    }

    #[test]
    fn test_history_is_owner_only() {
        let service = service();
        let account = service
            .open_account(
                10,
                AccountType::Current,
                "Amina Yusuf",
                Decimal::from(100),
                Channel::Online,
            )
            .unwrap();

        let err = service
            .account_history(
                &Principal::customer(11),
                account.id,
                &HistoryFilter::default(),
                Page::default(),
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));

        assert!(service
            .account_history(
                &Principal::admin(99),
                account.id,
                &HistoryFilter::default(),
                Page::default(),
            )
            .is_ok());
    }

    #[test]
    fn test_get_transaction_is_participant_only() {
        let service = service();
        let a = service
            .open_account(10, AccountType::Current, "A", Decimal::from(10_000), Channel::Online)
            .unwrap();
        let b = service
            .open_account(11, AccountType::Current, "B", Decimal::from(1_000), Channel::Online)
            .unwrap();

        let tx = service
            .create_transfer(
                &Principal::customer(10),
                TransferRequest {
                    kind: TransferKind::Transfer,
                    source_account_id: a.id,
                    destination: Destination::Internal { account_id: b.id },
                    amount: Decimal::from(250),
                    currency: DEFAULT_CURRENCY.to_string(),
                    description: "lunch".to_string(),
                    channel: Channel::Mobile,
                    subtype: None,
                    bill: None,
                },
            )
            .unwrap();

        // both participants can read it, a stranger cannot
        assert!(service
            .get_transaction(&Principal::customer(10), tx.id)
            .is_ok());
        assert!(service
            .get_transaction(&Principal::customer(11), tx.id)
            .is_ok());
        let err = service
            .get_transaction(&Principal::customer(12), tx.id)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
    }

    #[test]
    fn test_status_administration_is_admin_only() {
        let service = service();
        let account = service
            .open_account(10, AccountType::Current, "A", Decimal::ZERO, Channel::Online)
            .unwrap();

        let err = service
            .set_account_status(
                &Principal::customer(10),
                account.id,
                AccountStatus::Frozen,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));

        let frozen = service
            .set_account_status(&Principal::admin(99), account.id, AccountStatus::Frozen)
            .unwrap();
        assert_eq!(frozen.status, AccountStatus::Frozen);
    }

    #[test]
    fn test_flag_transaction_is_admin_only() {
        let service = service();
        service
            .open_account(10, AccountType::Current, "A", Decimal::from(100), Channel::Online)
            .unwrap();
        let tx_id = service.all_entries()[0].id;

        let err = service
            .flag_transaction(&Principal::customer(10), tx_id, true, None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));

        let flagged = service
            .flag_transaction(
                &Principal::admin(99),
                tx_id,
                true,
                Some("manual review".to_string()),
            )
            .unwrap();
        assert!(flagged.flagged);
        assert_eq!(flagged.flag_reason.as_deref(), Some("manual review"));
    }

    #[test]
    fn test_close_account_requires_zero_balance() {
        let service = service();
        let account = service
            .open_account(10, AccountType::Salary, "A", Decimal::from(100), Channel::Online)
            .unwrap();

        let err = service
            .close_account(&Principal::customer(10), account.id)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));

        // withdraw to zero, then closure succeeds (salary has no minimum)
        service
            .create_transfer(
                &Principal::customer(10),
                TransferRequest {
                    kind: TransferKind::Withdrawal,
                    source_account_id: account.id,
                    destination: Destination::None,
                    amount: Decimal::from(100),
                    currency: DEFAULT_CURRENCY.to_string(),
                    description: "close out".to_string(),
                    channel: Channel::Branch,
                    subtype: None,
                    bill: None,
                },
            )
            .unwrap();
        let closed = service
            .close_account(&Principal::customer(10), account.id)
            .unwrap();
        assert_eq!(closed.status, AccountStatus::Closed);
    }
}
