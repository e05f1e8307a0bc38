//! Replay drivers for the CSV harness
//!
//! A replay reads instructions from a CSV file and applies them to a
//! [`BankingService`]. Two drivers implement the same trait and produce
//! the same final state for the same input:
//!
//! - `sequential` - single-threaded, applies instructions in file order
//! - `concurrent` - fans movements out over a multi-thread tokio runtime,
//!   exercising the orchestrator's locking discipline
//!
//! Individual instruction rejections (insufficient funds, limits,
//! validation) are logged and counted, never fatal; only file-level
//! failures abort a replay.

use crate::core::BankingService;
use crate::types::LedgerError;
use std::path::Path;
use std::sync::Arc;

pub mod concurrent;
pub mod sequential;

pub use concurrent::ConcurrentReplay;
pub use sequential::SequentialReplay;

/// Outcome counters of a replay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Accounts opened
    pub opened: usize,

    /// Movements committed
    pub applied: usize,

    /// Rows rejected (parse failures or refused operations)
    pub rejected: usize,
}

/// A replay driver
pub trait ReplayStrategy: Send + Sync {
    /// Apply every instruction in the file to the service
    ///
    /// # Errors
    ///
    /// Returns an error only for file-level failures (missing file,
    /// unreadable CSV structure); per-row rejections are counted in the
    /// returned stats.
    fn replay(
        &self,
        input_path: &Path,
        service: Arc<BankingService>,
    ) -> Result<ReplayStats, LedgerError>;
}

/// Replay execution modes selectable from the CLI
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ReplayMode {
    Sequential,
    Concurrent,
}

/// Create the driver for the requested mode
///
/// `workers` bounds the concurrent driver's parallelism and defaults to
/// the machine's logical CPU count; the sequential driver ignores it.
pub fn create_strategy(mode: ReplayMode, workers: Option<usize>) -> Box<dyn ReplayStrategy> {
    match mode {
        ReplayMode::Sequential => Box::new(SequentialReplay),
        ReplayMode::Concurrent => Box::new(ConcurrentReplay::new(
            workers.unwrap_or_else(num_cpus::get),
        )),
    }
}
