use crate::replay::ReplayMode;
use clap::Parser;
use std::path::PathBuf;

/// Replay banking instructions against the ledger core
#[derive(Parser, Debug)]
#[command(name = "ledger-core")]
#[command(about = "Replay banking instructions against the ledger core", long_about = None)]
pub struct CliArgs {
    /// Input CSV file with replay instructions
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Replay driver to use
    #[arg(
        long = "mode",
        value_name = "MODE",
        default_value = "sequential",
        help = "Replay mode: 'sequential' or 'concurrent'"
    )]
    pub mode: ReplayMode,

    /// Worker count for the concurrent driver
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Maximum movements in flight (default: CPU cores, concurrent mode only)"
    )]
    pub workers: Option<usize>,

    /// Where to write the final ledger CSV (accounts go to stdout)
    #[arg(
        long = "ledger-out",
        value_name = "PATH",
        help = "Optional path for the full ledger CSV"
    )]
    pub ledger_out: Option<PathBuf>,
}

/// Parse command-line arguments
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
