//! Sequential replay driver
//!
//! Applies instructions one at a time in file order. The baseline the
//! concurrent driver is compared against: same input, same final state.

use crate::io::{Instruction, InstructionReader};
use crate::replay::{ReplayStats, ReplayStrategy};
use crate::core::BankingService;
use crate::types::account::Principal;
use crate::types::LedgerError;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Single-threaded replay in file order
#[derive(Debug, Clone, Copy)]
pub struct SequentialReplay;

impl ReplayStrategy for SequentialReplay {
    fn replay(
        &self,
        input_path: &Path,
        service: Arc<BankingService>,
    ) -> Result<ReplayStats, LedgerError> {
        let reader = InstructionReader::open(input_path)?;
        let mut stats = ReplayStats::default();

        for item in reader {
            match item {
                Ok(Instruction::Open {
                    user,
                    account_type,
                    title,
                    opening_deposit,
                    channel,
                }) => match service.open_account(user, account_type, title, opening_deposit, channel)
                {
                    Ok(_) => stats.opened += 1,
                    Err(error) => {
                        warn!(%error, "open rejected");
                        stats.rejected += 1;
                    }
                },
                Ok(Instruction::Movement { user, request }) => {
                    match service.create_transfer(&Principal::customer(user), request) {
                        Ok(_) => stats.applied += 1,
                        Err(error) => {
                            warn!(%error, "movement rejected");
                            stats.rejected += 1;
                        }
                    }
                }
                Err(error) => {
                    warn!(%error, "instruction skipped");
                    stats.rejected += 1;
                }
            }
        }

        Ok(stats)
    }
}
