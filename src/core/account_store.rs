//! Account store: the single owner of account balance state
//!
//! Accounts live in a sharded concurrent map so that requests touching
//! different accounts never contend. Balance changes exclusively through
//! [`AccountStore::apply_delta`]; no other component writes balances.
//!
//! # Concurrency
//!
//! Two independent mechanisms back the discipline required of callers:
//!
//! - a per-account lock table ([`AccountStore::lock_handle`]) from which the
//!   orchestrator takes mutexes in ascending account-id order and holds them
//!   across its read-validate-write critical section, and
//! - an `expected_version` check inside `apply_delta`, so a write that
//!   somehow escapes the lock discipline is rejected as a conflict rather
//!   than silently lost.

use crate::types::{Account, AccountId, AccountStatus, LedgerError};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Thread-safe store of all accounts, keyed by internal id
///
/// Lookups by account number (used when resolving external transfer
/// recipients) go through a secondary index maintained on insert.
pub struct AccountStore {
    /// Account states by internal id
    accounts: DashMap<AccountId, Account>,

    /// Secondary index: account number -> internal id
    by_number: DashMap<String, AccountId>,

    /// Per-account mutexes handed to the orchestrator for its ordered
    /// locking; created lazily on first use
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl AccountStore {
    /// Create an empty store
    pub fn new() -> Self {
        AccountStore {
            accounts: DashMap::new(),
            by_number: DashMap::new(),
            locks: DashMap::new(),
        }
    }

    /// Register a newly opened account
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the id or account number is already
    /// registered.
    pub fn insert(&self, account: Account) -> Result<(), LedgerError> {
        if self.accounts.contains_key(&account.id) {
            return Err(LedgerError::validation(format!(
                "account id {} already exists",
                account.id
            )));
        }
        if self.by_number.contains_key(&account.account_number) {
            return Err(LedgerError::validation(format!(
                "account number {} already exists",
                account.account_number
            )));
        }
        self.by_number
            .insert(account.account_number.clone(), account.id);
        self.accounts.insert(account.id, account);
        Ok(())
    }

    /// Load a snapshot of an account by internal id
    pub fn load(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.accounts
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    /// Load a snapshot of an account by its account number
    pub fn load_by_account_number(&self, number: &str) -> Result<Account, LedgerError> {
        let id = self
            .by_number
            .get(number)
            .map(|entry| *entry.value())
            .ok_or_else(|| LedgerError::account_number_not_found(number))?;
        self.load(id)
    }

    /// Per-account mutex for the orchestrator's lock-ordering discipline
    ///
    /// The same handle is returned for every call with the same id, so all
    /// writers contend on one mutex per account.
    pub fn lock_handle(&self, id: AccountId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Adjust an account balance by a signed delta
    ///
    /// This is the only legitimate way balance changes. The write is
    /// rejected if the account is missing, not `Active`, the version does
    /// not match, or a negative delta would take the balance below the
    /// minimum-balance floor (debiting down to exactly the floor is
    /// allowed).
    ///
    /// # Returns
    ///
    /// The updated account snapshot, with `version` bumped by one.
    pub fn apply_delta(
        &self,
        id: AccountId,
        delta: Decimal,
        expected_version: u64,
    ) -> Result<Account, LedgerError> {
        let mut entry = self
            .accounts
            .get_mut(&id)
            .ok_or_else(|| LedgerError::account_not_found(id))?;
        let account = entry.value_mut();

        if account.version != expected_version {
            return Err(LedgerError::conflict(
                id,
                expected_version,
                account.version,
            ));
        }
        if !account.is_active() {
            return Err(LedgerError::invalid_state(
                "apply_delta",
                format!("account {} is {:?}", id, account.status),
            ));
        }

        let new_balance = account.balance.checked_add(delta).ok_or_else(|| {
            LedgerError::invalid_state("apply_delta", "balance arithmetic overflow")
        })?;

        if delta < Decimal::ZERO && new_balance < account.minimum_balance {
            return Err(LedgerError::insufficient_funds(
                id,
                account.balance,
                account.minimum_balance,
                delta.abs(),
            ));
        }

        account.balance = new_balance;
        account.available_balance = new_balance;
        account.version += 1;

        debug!(
            account = id,
            %delta,
            balance = %account.balance,
            version = account.version,
            "applied balance delta"
        );

        Ok(account.clone())
    }

    /// Change an account's lifecycle status
    ///
    /// `Closed` is terminal and requires a zero balance at the moment of
    /// closure; no transition leaves it.
    pub fn set_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<Account, LedgerError> {
        let mut entry = self
            .accounts
            .get_mut(&id)
            .ok_or_else(|| LedgerError::account_not_found(id))?;
        let account = entry.value_mut();

        if account.status == AccountStatus::Closed {
            return Err(LedgerError::invalid_state(
                "set_status",
                format!("account {} is closed", id),
            ));
        }
        if status == AccountStatus::Closed && account.balance != Decimal::ZERO {
            return Err(LedgerError::invalid_state(
                "close",
                format!(
                    "account {} balance {} must be zero at closure",
                    id, account.balance
                ),
            ));
        }

        account.status = status;
        account.version += 1;
        Ok(account.clone())
    }

    /// Snapshot of all accounts, sorted by id for deterministic output
    pub fn all_accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(|account| account.id);
        accounts
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountType;
    use chrono::Utc;

    fn store_with(id: AccountId, balance: i64) -> AccountStore {
        let store = AccountStore::new();
        let mut account = Account::open(
            id,
            format!("{:012}", 100_000_000_000u64 + id),
            1,
            AccountType::Savings,
            "Test Holder".to_string(),
            Utc::now(),
        );
        account.balance = Decimal::from(balance);
        account.available_balance = Decimal::from(balance);
        store.insert(account).unwrap();
        store
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let store = store_with(1, 0);
        let duplicate = Account::open(
            1,
            "999999999999".to_string(),
            2,
            AccountType::Current,
            "Other".to_string(),
            Utc::now(),
        );
        assert!(matches!(
            store.insert(duplicate).unwrap_err(),
            LedgerError::ValidationError { .. }
        ));
    }

    #[test]
    fn test_load_by_account_number() {
        let store = store_with(3, 100);
        let account = store.load_by_account_number("100000000003").unwrap();
        assert_eq!(account.id, 3);

        assert!(matches!(
            store.load_by_account_number("000000000000").unwrap_err(),
            LedgerError::NotFound { .. }
        ));
    }

    #[test]
    fn test_apply_delta_updates_balance_and_version() {
        let store = store_with(1, 1_000);

        let updated = store.apply_delta(1, Decimal::from(250), 0).unwrap();
        assert_eq!(updated.balance, Decimal::from(1_250));
        assert_eq!(updated.available_balance, Decimal::from(1_250));
        assert_eq!(updated.version, 1);
    }

    #[test]
    fn test_apply_delta_rejects_stale_version() {
        let store = store_with(1, 1_000);
        store.apply_delta(1, Decimal::from(100), 0).unwrap();

        let err = store.apply_delta(1, Decimal::from(100), 0).unwrap_err();
        assert_eq!(err, LedgerError::conflict(1, 0, 1));

        // the rejected write left nothing behind
        assert_eq!(store.load(1).unwrap().balance, Decimal::from(1_100));
    }

    #[test]
    fn test_apply_delta_rejects_non_active_account() {
        let store = store_with(1, 1_000);
        store.set_status(1, AccountStatus::Frozen).unwrap();

        let account = store.load(1).unwrap();
        let err = store
            .apply_delta(1, Decimal::from(10), account.version)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));
    }

    #[test]
    fn test_debit_to_exact_minimum_is_allowed() {
        // savings minimum balance is 500
        let store = store_with(1, 1_000);

        let updated = store.apply_delta(1, Decimal::from(-500), 0).unwrap();
        assert_eq!(updated.balance, Decimal::from(500));
    }

    #[test]
    fn test_debit_below_minimum_is_rejected() {
        let store = store_with(1, 1_000);

        let err = store.apply_delta(1, Decimal::from(-501), 0).unwrap_err();
        assert_eq!(
            err,
            LedgerError::insufficient_funds(
                1,
                Decimal::from(1_000),
                Decimal::from(500),
                Decimal::from(501),
            )
        );
        assert_eq!(store.load(1).unwrap().balance, Decimal::from(1_000));
    }

    #[test]
    fn test_close_requires_zero_balance() {
        let store = store_with(1, 1_000);

        let err = store.set_status(1, AccountStatus::Closed).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));
    }

    #[test]
    fn test_closed_is_terminal() {
        let store = store_with(1, 0);
        store.set_status(1, AccountStatus::Closed).unwrap();

        let err = store.set_status(1, AccountStatus::Active).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidState { .. }));
    }

    #[test]
    fn test_lock_handle_is_shared_per_account() {
        let store = store_with(1, 0);
        let a = store.lock_handle(1);
        let b = store.lock_handle(1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_all_accounts_sorted_by_id() {
        let store = AccountStore::new();
        for id in [3u64, 1, 2] {
            store
                .insert(Account::open(
                    id,
                    format!("{:012}", id),
                    1,
                    AccountType::Current,
                    "Holder".to_string(),
                    Utc::now(),
                ))
                .unwrap();
        }
        let ids: Vec<AccountId> = store.all_accounts().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
