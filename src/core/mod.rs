//! Core business logic module
//!
//! This module contains the transaction-processing components:
//! - `account_store` - account state, balances, and the lock table
//! - `limits` - daily/monthly debit ceiling evaluation
//! - `fees` - the (type, subtype) fee policy table
//! - `ledger` - the append-oriented transaction ledger and its queries
//! - `orchestrator` - validation, locking, and the atomic commit
//! - `direction` - debit/credit classification for display
//! - `service` - the authorization facade exposed to callers
//! - `traits` - collaborator seams (notifications)

pub mod account_store;
pub mod direction;
pub mod fees;
pub mod ledger;
pub mod limits;
pub mod orchestrator;
pub mod service;
pub mod traits;

pub use account_store::AccountStore;
pub use direction::classify;
pub use fees::FeePolicy;
pub use ledger::TransactionLedger;
pub use limits::{LimitCheck, LimitEvaluator};
pub use orchestrator::TransferOrchestrator;
pub use service::BankingService;
pub use traits::{NoopNotifier, NotificationEvent, Notifier, QueueNotifier};
