//! I/O module
//!
//! CSV surface of the replay harness: instruction parsing and result
//! output.

pub mod csv_format;
pub mod reader;

pub use csv_format::{
    convert_instruction, write_accounts_csv, write_ledger_csv, CsvInstruction, Instruction,
};
pub use reader::InstructionReader;
