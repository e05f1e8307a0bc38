//! Concurrent replay driver with source-account partitioning
//!
//! Parses the whole instruction file up front, then processes movements on
//! a multi-thread tokio runtime. Each batch is partitioned by source
//! account: movements for different accounts run concurrently, while each
//! account's own movements keep their file order, so limit evaluation and
//! balance checks see the same per-account sequence the sequential driver
//! does.
//!
//! Account openings are ordering barriers: ids are assigned in file order,
//! so every pending movement batch is drained before an `open` applies.
//! Final state therefore matches the sequential driver; the orchestrator's
//! per-account locking is what makes the cross-account interleaving safe.

use crate::core::BankingService;
use crate::io::{Instruction, InstructionReader};
use crate::replay::{ReplayStats, ReplayStrategy};
use crate::types::account::{AccountId, Principal, UserId};
use crate::types::{LedgerError, TransferRequest};
use futures::future::join_all;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Multi-threaded replay with per-source-account ordering
#[derive(Debug, Clone, Copy)]
pub struct ConcurrentReplay {
    workers: usize,
}

impl ConcurrentReplay {
    /// Create a driver with the given runtime worker count
    ///
    /// A zero worker count is treated as one.
    pub fn new(workers: usize) -> Self {
        ConcurrentReplay {
            workers: workers.max(1),
        }
    }

    /// Partition a batch by source account, preserving per-account order
    fn partition(
        batch: Vec<(UserId, TransferRequest)>,
    ) -> HashMap<AccountId, Vec<(UserId, TransferRequest)>> {
        let mut partitions: HashMap<AccountId, Vec<(UserId, TransferRequest)>> = HashMap::new();
        for (user, request) in batch {
            partitions
                .entry(request.source_account_id)
                .or_default()
                .push((user, request));
        }
        partitions
    }

    /// Run one batch: one task per source account, movements in order
    async fn drain(
        service: &Arc<BankingService>,
        batch: &mut Vec<(UserId, TransferRequest)>,
        stats: &mut ReplayStats,
    ) {
        let tasks: Vec<_> = Self::partition(std::mem::take(batch))
            .into_values()
            .map(|movements| {
                let service = service.clone();
                tokio::spawn(async move {
                    let mut applied = 0usize;
                    let mut rejected = 0usize;
                    for (user, request) in movements {
                        match service.create_transfer(&Principal::customer(user), request) {
                            Ok(_) => applied += 1,
                            Err(error) => {
                                warn!(%error, "movement rejected");
                                rejected += 1;
                            }
                        }
                    }
                    (applied, rejected)
                })
            })
            .collect();

        for joined in join_all(tasks).await {
            match joined {
                Ok((applied, rejected)) => {
                    stats.applied += applied;
                    stats.rejected += rejected;
                }
                Err(join_error) => {
                    warn!(%join_error, "partition task failed");
                    stats.rejected += 1;
                }
            }
        }
    }
}

impl ReplayStrategy for ConcurrentReplay {
    fn replay(
        &self,
        input_path: &Path,
        service: Arc<BankingService>,
    ) -> Result<ReplayStats, LedgerError> {
        let instructions: Vec<Result<Instruction, LedgerError>> =
            InstructionReader::open(input_path)?.collect();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.workers)
            .enable_all()
            .build()
            .map_err(|error| {
                LedgerError::validation(format!("cannot start runtime: {}", error))
            })?;

        runtime.block_on(async {
            let mut stats = ReplayStats::default();
            let mut batch: Vec<(UserId, TransferRequest)> = Vec::new();

            for item in instructions {
                match item {
                    Ok(Instruction::Open {
                        user,
                        account_type,
                        title,
                        opening_deposit,
                        channel,
                    }) => {
                        // opens are barriers: drain in-flight movements so
                        // id assignment stays in file order
                        Self::drain(&service, &mut batch, &mut stats).await;
                        match service.open_account(
                            user,
                            account_type,
                            title,
                            opening_deposit,
                            channel,
                        ) {
                            Ok(_) => stats.opened += 1,
                            Err(error) => {
                                warn!(%error, "open rejected");
                                stats.rejected += 1;
                            }
                        }
                    }
                    Ok(Instruction::Movement { user, request }) => {
                        batch.push((user, request));
                    }
                    Err(error) => {
                        warn!(%error, "instruction skipped");
                        stats.rejected += 1;
                    }
                }
            }
            Self::drain(&service, &mut batch, &mut stats).await;

            Ok(stats)
        })
    }
}
