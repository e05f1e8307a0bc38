//! CSV format handling for replay instructions and result output
//!
//! This module centralizes the CSV surface of the replay harness:
//! - `CsvInstruction` structure for deserialization
//! - conversion from CSV rows to domain instructions
//! - final account-state and ledger output serialization
//!
//! All conversion functions are pure (no I/O) for easy testing.

use crate::types::account::UserId;
use crate::types::{
    Account, AccountType, BillDetails, Channel, Destination, LedgerError, Transaction,
    TransferKind, TransferRequest, DEFAULT_CURRENCY,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// One parsed replay instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Open an account; ids are assigned in instruction order
    Open {
        user: UserId,
        account_type: AccountType,
        title: String,
        opening_deposit: Decimal,
        channel: Channel,
    },

    /// A money movement executed on behalf of `user`
    Movement {
        user: UserId,
        request: TransferRequest,
    },
}

/// CSV row structure for deserialization
///
/// Columns: `kind,user,account,to_account,to_number,to_title,account_type,
/// amount,subtype,description,channel`. Which fields are required depends
/// on the kind; the conversion below enforces that.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvInstruction {
    pub kind: String,
    pub user: UserId,
    pub account: Option<u64>,
    pub to_account: Option<u64>,
    pub to_number: Option<String>,
    pub to_title: Option<String>,
    pub account_type: Option<String>,
    pub amount: Option<String>,
    pub subtype: Option<String>,
    pub description: Option<String>,
    pub channel: Option<String>,
}

/// Convert a CSV row to a domain instruction
///
/// Validates per-kind field presence and value formats; the returned
/// errors are recoverable (the replay drivers log and skip the row).
pub fn convert_instruction(row: CsvInstruction) -> Result<Instruction, LedgerError> {
    let channel = parse_channel(row.channel.as_deref())?;

    match row.kind.to_lowercase().as_str() {
        "open" => {
            let account_type = parse_account_type(row.account_type.as_deref())?;
            let title = non_empty(row.description.as_deref()).ok_or_else(|| {
                LedgerError::validation("open requires a title in the description column")
            })?;
            let opening_deposit = match row.amount.as_deref() {
                Some(raw) if !raw.trim().is_empty() => parse_amount(raw)?,
                _ => Decimal::ZERO,
            };
            Ok(Instruction::Open {
                user: row.user,
                account_type,
                title: title.to_string(),
                opening_deposit,
                channel,
            })
        }
        kind @ ("transfer" | "payment" | "withdrawal" | "deposit") => {
            let transfer_kind = match kind {
                "transfer" => TransferKind::Transfer,
                "payment" => TransferKind::Payment,
                "withdrawal" => TransferKind::Withdrawal,
                _ => TransferKind::Deposit,
            };
            let source_account_id = row
                .account
                .ok_or_else(|| LedgerError::validation("movement requires an account"))?;
            let amount = parse_amount(row.amount.as_deref().unwrap_or(""))?;

            let destination = match (row.to_account, non_empty(row.to_number.as_deref())) {
                (Some(account_id), _) => Destination::Internal { account_id },
                (None, Some(number)) => {
                    let claimed_title = non_empty(row.to_title.as_deref()).ok_or_else(|| {
                        LedgerError::validation(
                            "external destination requires a recipient title",
                        )
                    })?;
                    Destination::External {
                        account_number: number.to_string(),
                        claimed_title: claimed_title.to_string(),
                    }
                }
                (None, None) => Destination::None,
            };

            let bill = if row.subtype.as_deref() == Some("bill_payment") {
                non_empty(row.to_title.as_deref()).map(|biller| BillDetails {
                    biller_name: biller.to_string(),
                    consumer_number: row.to_number.clone().unwrap_or_default(),
                })
            } else {
                None
            };

            Ok(Instruction::Movement {
                user: row.user,
                request: TransferRequest {
                    kind: transfer_kind,
                    source_account_id,
                    destination,
                    amount,
                    currency: DEFAULT_CURRENCY.to_string(),
                    description: row
                        .description
                        .unwrap_or_else(|| kind.to_string()),
                    channel,
                    subtype: row.subtype,
                    bill,
                },
            })
        }
        other => Err(LedgerError::validation(format!(
            "invalid instruction kind '{}'",
            other
        ))),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_amount(raw: &str) -> Result<Decimal, LedgerError> {
    Decimal::from_str(raw.trim())
        .map_err(|_| LedgerError::validation(format!("invalid amount '{}'", raw)))
}

fn parse_channel(raw: Option<&str>) -> Result<Channel, LedgerError> {
    match non_empty(raw) {
        None => Ok(Channel::Online),
        Some(value) => match value.to_lowercase().as_str() {
            "online" => Ok(Channel::Online),
            "mobile" => Ok(Channel::Mobile),
            "atm" => Ok(Channel::Atm),
            "branch" => Ok(Channel::Branch),
            other => Err(LedgerError::validation(format!(
                "invalid channel '{}'",
                other
            ))),
        },
    }
}

fn parse_account_type(raw: Option<&str>) -> Result<AccountType, LedgerError> {
    match non_empty(raw) {
        None => Err(LedgerError::validation("open requires an account_type")),
        Some(value) => match value.to_lowercase().as_str() {
            "savings" => Ok(AccountType::Savings),
            "current" => Ok(AccountType::Current),
            "fixed_deposit" => Ok(AccountType::FixedDeposit),
            "islamic_savings" => Ok(AccountType::IslamicSavings),
            "salary" => Ok(AccountType::Salary),
            other => Err(LedgerError::validation(format!(
                "invalid account type '{}'",
                other
            ))),
        },
    }
}

/// Write final account states as CSV
///
/// Accounts are already sorted by id by the store, which keeps the output
/// deterministic for fixture comparison.
pub fn write_accounts_csv(
    accounts: &[Account],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);
    writer
        .write_record([
            "id",
            "account_number",
            "user",
            "account_type",
            "title",
            "balance",
            "minimum_balance",
            "status",
        ])
        .map_err(csv_error)?;

    for account in accounts {
        writer
            .write_record([
                account.id.to_string(),
                account.account_number.clone(),
                account.user_id.to_string(),
                format!("{:?}", account.account_type),
                account.title.clone(),
                account.balance.to_string(),
                account.minimum_balance.to_string(),
                format!("{:?}", account.status),
            ])
            .map_err(csv_error)?;
    }
    writer.flush().map_err(|e| LedgerError::validation(e.to_string()))
}

/// Write the full ledger as CSV, in insertion order
///
/// Timestamps are deliberately omitted so fixture outputs stay stable
/// across runs.
pub fn write_ledger_csv(
    entries: &[Transaction],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);
    writer
        .write_record([
            "id", "type", "subtype", "status", "amount", "fees", "from", "to",
        ])
        .map_err(csv_error)?;

    for tx in entries {
        writer
            .write_record([
                tx.id.to_string(),
                format!("{:?}", tx.tx_type),
                tx.subtype.clone().unwrap_or_default(),
                format!("{:?}", tx.status),
                tx.amount.to_string(),
                tx.fees.total.to_string(),
                tx.from_account.map(|id| id.to_string()).unwrap_or_default(),
                tx.to_account.map(|id| id.to_string()).unwrap_or_default(),
            ])
            .map_err(csv_error)?;
    }
    writer.flush().map_err(|e| LedgerError::validation(e.to_string()))
}

fn csv_error(error: csv::Error) -> LedgerError {
    LedgerError::validation(error.to_string())
}
