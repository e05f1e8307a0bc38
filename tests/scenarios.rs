//! End-to-end scenario tests against the service facade
//!
//! These tests exercise the documented guarantees of the core through the
//! public API only: conservation of money, the minimum-balance floor,
//! commit atomicity under an injected fault, limit arithmetic, direction
//! classification, and the concurrent-replay behavior of the orchestrator's
//! locking discipline.

use ledger_core::types::account::Principal;
use ledger_core::types::{HistoryFilter, Page};
use ledger_core::{
    AccountStatus, AccountType, BankingService, Channel, Destination, Direction, LedgerError,
    NoopNotifier, NotificationEvent, QueueNotifier, TransactionStatus, TransferKind,
    TransferRequest,
};
use rust_decimal::Decimal;
use std::sync::Arc;

fn service() -> BankingService {
    BankingService::new(Arc::new(NoopNotifier))
}

fn transfer(from: u64, to: u64, amount: i64) -> TransferRequest {
    TransferRequest {
        kind: TransferKind::Transfer,
        source_account_id: from,
        destination: Destination::Internal { account_id: to },
        amount: Decimal::from(amount),
        currency: "PKR".to_string(),
        description: "scenario".to_string(),
        channel: Channel::Online,
        subtype: None,
        bill: None,
    }
}

fn total_balance(service: &BankingService) -> Decimal {
    service
        .all_accounts()
        .iter()
        .map(|account| account.balance)
        .sum()
}

/// Account A (10,000, daily limit 50,000, nothing used today) transfers
/// 6,000 to account B (2,000): A ends at 4,000, B at 8,000, the entry is
/// completed, and the directions read debit/credit respectively.
#[test]
fn test_basic_transfer_scenario() {
    let service = service();
    let a = service
        .open_account(10, AccountType::Savings, "Amina Yusuf", Decimal::from(10_000), Channel::Branch)
        .unwrap();
    let b = service
        .open_account(11, AccountType::Savings, "Bilal Khan", Decimal::from(2_000), Channel::Branch)
        .unwrap();

    let tx = service
        .create_transfer(&Principal::customer(10), transfer(a.id, b.id, 6_000))
        .unwrap();

    assert_eq!(tx.status, TransactionStatus::Completed);
    assert_eq!(
        service.get_account(&Principal::customer(10), a.id).unwrap().balance,
        Decimal::from(4_000)
    );
    assert_eq!(
        service.get_account(&Principal::customer(11), b.id).unwrap().balance,
        Decimal::from(8_000)
    );

    let a_history = service
        .account_history(&Principal::customer(10), a.id, &HistoryFilter::default(), Page::default())
        .unwrap();
    assert_eq!(a_history[0].1, Direction::Debit);

    let b_history = service
        .account_history(&Principal::customer(11), b.id, &HistoryFilter::default(), Page::default())
        .unwrap();
    assert_eq!(b_history[0].1, Direction::Credit);
}

/// With 6,000 already debited today against a 50,000 daily limit, a
/// 45,000 transfer is refused with the exact shortfall of 1,000 and no
/// balance change.
#[test]
fn test_daily_limit_shortfall_scenario() {
    let service = service();
    let a = service
        .open_account(10, AccountType::Savings, "Amina Yusuf", Decimal::from(100_000), Channel::Branch)
        .unwrap();
    let b = service
        .open_account(11, AccountType::Savings, "Bilal Khan", Decimal::from(2_000), Channel::Branch)
        .unwrap();

    service
        .create_transfer(&Principal::customer(10), transfer(a.id, b.id, 6_000))
        .unwrap();
    let before = service
        .get_account(&Principal::customer(10), a.id)
        .unwrap()
        .balance;

    let err = service
        .create_transfer(&Principal::customer(10), transfer(a.id, b.id, 45_000))
        .unwrap_err();
    match err {
        LedgerError::LimitExceeded {
            used,
            limit,
            exceeds_by,
            ..
        } => {
            assert_eq!(used, Decimal::from(6_000));
            assert_eq!(limit, Decimal::from(50_000));
            assert_eq!(exceeds_by, Decimal::from(1_000));
        }
        other => panic!("expected LimitExceeded, got {:?}", other),
    }
    assert_eq!(
        service.get_account(&Principal::customer(10), a.id).unwrap().balance,
        before
    );
}

/// A fixed-deposit account refuses every debit regardless of balance.
#[test]
fn test_fixed_deposit_refuses_debits() {
    let service = service();
    let fd = service
        .open_account(10, AccountType::FixedDeposit, "Amina Yusuf", Decimal::from(500_000), Channel::Branch)
        .unwrap();

    let withdrawal = TransferRequest {
        kind: TransferKind::Withdrawal,
        destination: Destination::None,
        ..transfer(fd.id, 0, 1)
    };
    let err = service
        .create_transfer(&Principal::customer(10), withdrawal)
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidState { .. }));
    assert_eq!(
        service.get_account(&Principal::customer(10), fd.id).unwrap().balance,
        Decimal::from(500_000)
    );
}

/// The minimum-balance floor holds for every debit path; debiting to the
/// exact floor is the permitted boundary.
#[test]
fn test_minimum_balance_floor() {
    let service = service();
    // savings floor is 500
    let a = service
        .open_account(10, AccountType::Savings, "Amina Yusuf", Decimal::from(1_500), Channel::Branch)
        .unwrap();

    let withdrawal = |amount: i64| TransferRequest {
        kind: TransferKind::Withdrawal,
        destination: Destination::None,
        ..transfer(a.id, 0, amount)
    };

    let err = service
        .create_transfer(&Principal::customer(10), withdrawal(1_001))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));

    service
        .create_transfer(&Principal::customer(10), withdrawal(1_000))
        .unwrap();
    assert_eq!(
        service.get_account(&Principal::customer(10), a.id).unwrap().balance,
        Decimal::from(500)
    );
}

/// Fault injection: the destination is frozen between validation and the
/// credit, so the commit fails mid-flight. The observable outcome must be
/// all-or-nothing: both balances unchanged and the entry terminal Failed.
#[test]
fn test_commit_fault_is_atomic() {
    let service = service();
    let a = service
        .open_account(10, AccountType::Current, "Amina Yusuf", Decimal::from(10_000), Channel::Branch)
        .unwrap();
    let b = service
        .open_account(11, AccountType::Current, "Bilal Khan", Decimal::from(2_000), Channel::Branch)
        .unwrap();
    service
        .set_account_status(&Principal::admin(99), b.id, AccountStatus::Frozen)
        .unwrap();

    let err = service
        .create_transfer(&Principal::customer(10), transfer(a.id, b.id, 1_000))
        .unwrap_err();
    assert!(matches!(err, LedgerError::CommitFailure { .. }));

    assert_eq!(
        service.get_account(&Principal::customer(10), a.id).unwrap().balance,
        Decimal::from(10_000)
    );
    assert_eq!(
        service.get_account(&Principal::admin(99), b.id).unwrap().balance,
        Decimal::from(2_000)
    );

    // the failed attempt is visible in the source account's history as a
    // terminal entry, never as a stuck Processing one
    let history = service
        .account_history(&Principal::customer(10), a.id, &HistoryFilter::default(), Page::default())
        .unwrap();
    let failed: Vec<_> = history
        .iter()
        .filter(|(tx, _)| tx.status == TransactionStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
}

/// Conservation: across a mixed sequence of internal movements the total
/// of all balances changes only by the fees charged.
#[test]
fn test_conservation_with_fees() {
    let service = service();
    let a = service
        .open_account(10, AccountType::Current, "Amina Yusuf", Decimal::from(50_000), Channel::Branch)
        .unwrap();
    let b = service
        .open_account(11, AccountType::Current, "Bilal Khan", Decimal::from(20_000), Channel::Branch)
        .unwrap();
    let initial = total_balance(&service);

    service
        .create_transfer(&Principal::customer(10), transfer(a.id, b.id, 3_000))
        .unwrap();
    service
        .create_transfer(&Principal::customer(11), transfer(b.id, a.id, 1_200))
        .unwrap();
    // external transfer carries the flat 25 fee
    let external = TransferRequest {
        destination: Destination::External {
            account_number: b.account_number.clone(),
            claimed_title: "Bilal".to_string(),
        },
        ..transfer(a.id, 0, 2_000)
    };
    let tx = service
        .create_transfer(&Principal::customer(10), external)
        .unwrap();
    assert_eq!(tx.fees.total, Decimal::from(25));

    assert_eq!(total_balance(&service), initial - Decimal::from(25));
}

/// Completed entries satisfy the snapshot invariant:
/// `from_after == from_before - amount - fees` and
/// `to_after == to_before + amount`.
#[test]
fn test_snapshot_invariant_on_completed_entries() {
    let service = service();
    let a = service
        .open_account(10, AccountType::Current, "Amina Yusuf", Decimal::from(50_000), Channel::Branch)
        .unwrap();
    let b = service
        .open_account(11, AccountType::Current, "Bilal Khan", Decimal::from(1_000), Channel::Branch)
        .unwrap();

    let external = TransferRequest {
        destination: Destination::External {
            account_number: b.account_number.clone(),
            claimed_title: "Bilal Khan".to_string(),
        },
        ..transfer(a.id, 0, 4_000)
    };
    let tx = service
        .create_transfer(&Principal::customer(10), external)
        .unwrap();

    let from_before = tx.from_balance_before.unwrap();
    let from_after = tx.from_balance_after.unwrap();
    let to_before = tx.to_balance_before.unwrap();
    let to_after = tx.to_balance_after.unwrap();
    assert_eq!(from_after, from_before - tx.amount - tx.fees.total);
    assert_eq!(to_after, to_before + tx.amount);
}

/// The monthly summary aggregates only completed entries and never feeds
/// back into balances.
#[test]
fn test_monthly_summary() {
    use chrono::{Datelike, Utc};

    let service = service();
    let a = service
        .open_account(10, AccountType::Current, "Amina Yusuf", Decimal::from(30_000), Channel::Branch)
        .unwrap();
    let b = service
        .open_account(11, AccountType::Current, "Bilal Khan", Decimal::from(5_000), Channel::Branch)
        .unwrap();

    service
        .create_transfer(&Principal::customer(10), transfer(a.id, b.id, 2_500))
        .unwrap();

    let now = Utc::now();
    let summary = service
        .monthly_summary(&Principal::customer(10), a.id, now.year(), now.month())
        .unwrap();

    // the opening deposit credits 30,000; the transfer debits 2,500
    assert_eq!(summary.total_in, Decimal::from(30_000));
    assert_eq!(summary.total_out, Decimal::from(2_500));
    assert_eq!(summary.count, 2);
}

/// Notifications go to both owners after commit, and only after commit.
#[test]
fn test_notifications_after_commit() {
    let (notifier, receiver) = QueueNotifier::pair();
    let service = BankingService::new(Arc::new(notifier));
    let a = service
        .open_account(10, AccountType::Current, "Amina Yusuf", Decimal::from(10_000), Channel::Branch)
        .unwrap();
    let b = service
        .open_account(11, AccountType::Current, "Bilal Khan", Decimal::ZERO, Channel::Branch)
        .unwrap();
    // drain the opening-deposit notification
    while receiver.try_recv().is_ok() {}

    // a refused transfer must notify nobody
    let err = service
        .create_transfer(&Principal::customer(10), transfer(a.id, b.id, 99_000))
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    assert!(receiver.try_recv().is_err());

    service
        .create_transfer(&Principal::customer(10), transfer(a.id, b.id, 1_000))
        .unwrap();
    let events: Vec<_> = receiver.try_iter().collect();
    assert_eq!(events.len(), 2);
    assert!(events.iter().any(|(user, event)| {
        *user == 10 && matches!(event, NotificationEvent::TransferCompleted { .. })
    }));
    assert!(events.iter().any(|(user, event)| {
        *user == 11 && matches!(event, NotificationEvent::FundsReceived { .. })
    }));
}

/// Concurrent transfers over a shared account set: the per-account locks
/// must serialize balance updates so the total is conserved exactly.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_conserve_total() {
    let service = Arc::new(service());
    let mut accounts = Vec::new();
    for user in 0..4u64 {
        let account = service
            .open_account(
                user,
                AccountType::Current,
                format!("Holder {}", user),
                Decimal::from(25_000),
                Channel::Branch,
            )
            .unwrap();
        accounts.push(account.id);
    }
    let initial = total_balance(&service);

    let mut tasks = Vec::new();
    for round in 0..50u64 {
        let service = service.clone();
        let from = accounts[(round % 4) as usize];
        let to = accounts[((round + 1) % 4) as usize];
        tasks.push(tokio::spawn(async move {
            service.create_transfer(&Principal::customer(round % 4), transfer(from, to, 100))
        }));
    }

    let mut applied = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            applied += 1;
        }
    }

    assert_eq!(applied, 50);
    assert_eq!(total_balance(&service), initial);

    // every ledger entry ended in a terminal or never-started state;
    // nothing is stuck in Processing
    assert!(service
        .all_entries()
        .iter()
        .all(|tx| tx.status != TransactionStatus::Processing));
}
