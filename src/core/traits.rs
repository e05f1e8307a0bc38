//! Collaborator seams for the ledger core
//!
//! The notification collaborator is consumed through a trait so the core
//! never depends on delivery details. Dispatch is fire-and-forget: it
//! happens only after a successful commit, and a failing or absent
//! consumer must never roll back a transfer.

use crate::types::{TransactionId, UserId};
use rust_decimal::Decimal;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

/// Events emitted to account owners after commit
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    /// The principal's requested movement completed
    TransferCompleted {
        transaction: TransactionId,
        reference: String,
        amount: Decimal,
    },

    /// Funds arrived from another account
    FundsReceived {
        transaction: TransactionId,
        reference: String,
        amount: Decimal,
    },

    /// A pending transaction was cancelled
    TransferCancelled {
        transaction: TransactionId,
        reference: String,
    },
}

/// Notification collaborator interface
///
/// Implementations must not block: `notify` is called outside the atomic
/// commit but on the request path.
pub trait Notifier: Send + Sync {
    fn notify(&self, user_id: UserId, event: NotificationEvent);
}

/// Notifier that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _user_id: UserId, _event: NotificationEvent) {}
}

/// Notifier that enqueues events onto an in-process channel
///
/// Used by the replay harness and tests to observe dispatches. A
/// disconnected receiver is ignored, preserving fire-and-forget
/// semantics.
pub struct QueueNotifier {
    sender: Mutex<Sender<(UserId, NotificationEvent)>>,
}

impl QueueNotifier {
    /// Create a notifier and the receiving end of its queue
    pub fn pair() -> (Self, Receiver<(UserId, NotificationEvent)>) {
        let (sender, receiver) = channel();
        (
            QueueNotifier {
                sender: Mutex::new(sender),
            },
            receiver,
        )
    }
}

impl Notifier for QueueNotifier {
    fn notify(&self, user_id: UserId, event: NotificationEvent) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // fire-and-forget: a gone receiver must not fail the caller
        let _ = sender.send((user_id, event));
    }
}
