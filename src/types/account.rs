//! Account-related types for the ledger core
//!
//! This module defines the Account structure, the account-type catalogue with
//! its per-type limit policy, and the account status lifecycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Internal account identifier
///
/// Accounts are also addressable by their system-generated account number
/// (see [`Account::account_number`]); the numeric id is the internal key.
pub type AccountId = u64;

/// Owning user identifier, supplied by the identity collaborator
pub type UserId = u64;

/// The authenticated caller of a service operation
///
/// Supplied by the identity collaborator and threaded explicitly into
/// every call; the capability check happens once at the service boundary
/// instead of role switches inside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub admin: bool,
}

impl Principal {
    /// A regular customer principal
    pub fn customer(user_id: UserId) -> Self {
        Principal {
            user_id,
            admin: false,
        }
    }

    /// An administrative principal
    pub fn admin(user_id: UserId) -> Self {
        Principal {
            user_id,
            admin: true,
        }
    }

    /// Whether this principal may act on the given account
    pub fn can_act_for(&self, account: &Account) -> bool {
        self.admin || account.user_id == self.user_id
    }
}

/// Account product types
///
/// Each type carries a fixed interest rate and a limit policy that is
/// applied at account opening. Limits are admin-overridable afterwards;
/// the type-level policy only supplies the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Interest-bearing savings account
    Savings,

    /// Checking account with higher transaction ceilings
    Current,

    /// Term deposit; debits are categorically disabled
    FixedDeposit,

    /// Profit-sharing savings account (no fixed interest)
    IslamicSavings,

    /// Salary disbursement account with no minimum balance
    Salary,
}

impl AccountType {
    /// Annual interest rate in percent for this account type
    pub fn interest_rate(&self) -> Decimal {
        match self {
            AccountType::Savings => Decimal::new(450, 2),      // 4.50
            AccountType::Current => Decimal::ZERO,
            AccountType::FixedDeposit => Decimal::new(725, 2), // 7.25
            AccountType::IslamicSavings => Decimal::ZERO,
            AccountType::Salary => Decimal::new(150, 2), // 1.50
        }
    }

    /// Default daily debit ceiling for this account type
    pub fn default_daily_limit(&self) -> Decimal {
        match self {
            AccountType::Savings | AccountType::IslamicSavings => Decimal::from(50_000),
            AccountType::Current => Decimal::from(100_000),
            AccountType::FixedDeposit => Decimal::ZERO,
            AccountType::Salary => Decimal::from(75_000),
        }
    }

    /// Default monthly debit ceiling for this account type
    pub fn default_monthly_limit(&self) -> Decimal {
        match self {
            AccountType::Savings | AccountType::IslamicSavings => Decimal::from(500_000),
            AccountType::Current => Decimal::from(1_000_000),
            AccountType::FixedDeposit => Decimal::ZERO,
            AccountType::Salary => Decimal::from(750_000),
        }
    }

    /// Default minimum balance (the withdrawal floor) for this account type
    pub fn default_minimum_balance(&self) -> Decimal {
        match self {
            AccountType::Savings | AccountType::IslamicSavings => Decimal::from(500),
            AccountType::Current => Decimal::from(1_000),
            AccountType::FixedDeposit | AccountType::Salary => Decimal::ZERO,
        }
    }

    /// Whether this account type permits debits at all
    ///
    /// Fixed deposits refuse every debit regardless of the configured
    /// limit values. This is a categorical policy, not a numeric one.
    pub fn debits_permitted(&self) -> bool {
        !matches!(self, AccountType::FixedDeposit)
    }
}

/// Account status lifecycle
///
/// `Closed` is terminal and only reachable when the balance is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Fully operational; the only status in which balance changes are accepted
    Active,

    /// Dormant; no transactions until reactivated
    Inactive,

    /// Administratively frozen; no transactions
    Frozen,

    /// Terminal; balance was zero at the moment of closure
    Closed,
}

/// A customer account
///
/// Balance is the single piece of mutable shared state in the subsystem.
/// It is owned by the account store and changes exclusively through
/// `AccountStore::apply_delta`; every successful delta bumps `version`,
/// which the store uses for optimistic conflict detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Internal account identifier
    pub id: AccountId,

    /// System-generated 12-digit account number used for external lookups
    pub account_number: String,

    /// Owning user, as resolved by the identity collaborator
    pub user_id: UserId,

    /// Product type; fixes the interest rate and default limit policy
    pub account_type: AccountType,

    /// Account title (holder name as printed on statements)
    pub title: String,

    /// Current balance
    pub balance: Decimal,

    /// Balance minus holds; equal to `balance` at rest since holds are
    /// not separately modeled
    pub available_balance: Decimal,

    /// Current lifecycle status
    pub status: AccountStatus,

    /// Daily debit ceiling (type default, admin-overridable)
    pub daily_limit: Decimal,

    /// Monthly debit ceiling (type default, admin-overridable)
    pub monthly_limit: Decimal,

    /// Withdrawal floor; an active account may be debited down to exactly
    /// this value but never below it
    pub minimum_balance: Decimal,

    /// Monotonically increasing modification counter
    pub version: u64,

    /// Opening timestamp
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Open a new account with type-derived defaults
    ///
    /// The account starts `Active` with a zero balance; the opening
    /// deposit, if any, is applied afterwards through the orchestrator so
    /// that it appears in the ledger like any other movement.
    pub fn open(
        id: AccountId,
        account_number: String,
        user_id: UserId,
        account_type: AccountType,
        title: String,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Account {
            id,
            account_number,
            user_id,
            account_type,
            title,
            balance: Decimal::ZERO,
            available_balance: Decimal::ZERO,
            status: AccountStatus::Active,
            daily_limit: account_type.default_daily_limit(),
            monthly_limit: account_type.default_monthly_limit(),
            minimum_balance: account_type.default_minimum_balance(),
            version: 0,
            created_at: opened_at,
        }
    }

    /// Whether the account is in the `Active` status
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Account number masked for display, keeping the last four digits
    ///
    /// Numbers shorter than four digits are returned fully masked.
    pub fn masked_number(&self) -> String {
        let digits = self.account_number.len();
        if digits < 4 {
            return "****-****-****".to_string();
        }
        format!("****-****-{}", &self.account_number[digits - 4..])
    }
}
