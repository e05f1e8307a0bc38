//! Streaming reader for replay instruction files
//!
//! Wraps a `csv::Reader` in an iterator that yields converted domain
//! instructions one at a time. Malformed rows surface as recoverable
//! errors so the drivers can log and continue with the next row.

use crate::io::csv_format::{convert_instruction, CsvInstruction, Instruction};
use crate::types::LedgerError;
use std::fs::File;
use std::path::Path;

/// Iterator over instructions in a CSV file
pub struct InstructionReader {
    records: csv::DeserializeRecordsIntoIter<File, CsvInstruction>,
}

impl std::fmt::Debug for InstructionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstructionReader").finish_non_exhaustive()
    }
}

impl InstructionReader {
    /// Open a replay file
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the path does not exist and a validation
    /// error for other open failures.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|error| {
            if error.kind() == std::io::ErrorKind::NotFound {
                LedgerError::NotFound {
                    resource: "file",
                    id: path.display().to_string(),
                }
            } else {
                LedgerError::validation(format!(
                    "cannot open {}: {}",
                    path.display(),
                    error
                ))
            }
        })?;
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(file);
        Ok(InstructionReader {
            records: reader.into_deserialize(),
        })
    }
}

impl Iterator for InstructionReader {
    type Item = Result<Instruction, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(match record {
            Ok(row) => convert_instruction(row),
            Err(error) => Err(LedgerError::validation(format!(
                "csv parse error: {}",
                error
            ))),
        })
    }
}
