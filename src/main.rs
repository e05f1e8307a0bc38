//! Ledger Core CLI
//!
//! Replays banking instructions from a CSV file against the ledger core
//! and writes the final account states to stdout.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- replay.csv > accounts.csv
//! cargo run -- --mode sequential replay.csv > accounts.csv
//! cargo run -- --mode concurrent --workers 8 replay.csv > accounts.csv
//! cargo run -- --ledger-out ledger.csv replay.csv > accounts.csv
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, unwritable output, etc.)

use ledger_core::cli;
use ledger_core::io::{write_accounts_csv, write_ledger_csv};
use ledger_core::replay::create_strategy;
use ledger_core::{BankingService, NoopNotifier};
use std::process;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    // the CLI runs without a notification collaborator
    let service = Arc::new(BankingService::new(Arc::new(NoopNotifier)));
    let strategy = create_strategy(args.mode, args.workers);

    let stats = match strategy.replay(&args.input_file, service.clone()) {
        Ok(stats) => stats,
        Err(error) => {
            eprintln!("Error: {}", error);
            process::exit(1);
        }
    };
    info!(
        opened = stats.opened,
        applied = stats.applied,
        rejected = stats.rejected,
        "replay finished"
    );

    let mut stdout = std::io::stdout();
    if let Err(error) = write_accounts_csv(&service.all_accounts(), &mut stdout) {
        eprintln!("Error: {}", error);
        process::exit(1);
    }

    if let Some(path) = args.ledger_out {
        let mut file = match std::fs::File::create(&path) {
            Ok(file) => file,
            Err(error) => {
                eprintln!("Error: cannot create {}: {}", path.display(), error);
                process::exit(1);
            }
        };
        if let Err(error) = write_ledger_csv(&service.all_entries(), &mut file) {
            eprintln!("Error: {}", error);
            process::exit(1);
        }
    }
}
