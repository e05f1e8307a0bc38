//! Fee calculator: a pluggable policy table keyed by (type, subtype)
//!
//! New fee rules are added to the table rather than branched into the
//! orchestrator. Lookup is first-match; a rule with no subtype matches any
//! subtype of its transaction type.

use crate::types::{FeeBreakdown, TransactionType};
use rust_decimal::Decimal;

/// Subtype marking a transfer that leaves the institution
pub const SUBTYPE_EXTERNAL_TRANSFER: &str = "external_transfer";

/// A single fee rule
#[derive(Debug, Clone)]
struct FeeRule {
    tx_type: TransactionType,
    subtype: Option<String>,
    fees: FeeBreakdown,
}

/// Fee policy table
///
/// The default policy charges a flat fee on external transfers and
/// nothing otherwise.
#[derive(Debug, Clone)]
pub struct FeePolicy {
    rules: Vec<FeeRule>,
}

impl FeePolicy {
    /// The standard policy: flat 25.00 on `external_transfer`, zero
    /// for everything else
    pub fn standard() -> Self {
        FeePolicy { rules: Vec::new() }.with_rule(
            TransactionType::Transfer,
            Some(SUBTYPE_EXTERNAL_TRANSFER),
            FeeBreakdown::new(Decimal::from(25), Decimal::ZERO, Decimal::ZERO),
        )
    }

    /// A policy that never charges fees
    pub fn free() -> Self {
        FeePolicy { rules: Vec::new() }
    }

    /// Add a rule; later rules do not override earlier matches
    pub fn with_rule(
        mut self,
        tx_type: TransactionType,
        subtype: Option<&str>,
        fees: FeeBreakdown,
    ) -> Self {
        self.rules.push(FeeRule {
            tx_type,
            subtype: subtype.map(str::to_string),
            fees,
        });
        self
    }

    /// Derive the fees for a transaction type and optional subtype
    ///
    /// Pure function of the table: the first matching rule wins and the
    /// absence of a match means zero fees.
    pub fn compute_fees(
        &self,
        tx_type: TransactionType,
        subtype: Option<&str>,
    ) -> FeeBreakdown {
        self.rules
            .iter()
            .find(|rule| {
                rule.tx_type == tx_type
                    && match &rule.subtype {
                        Some(required) => subtype == Some(required.as_str()),
                        None => true,
                    }
            })
            .map(|rule| rule.fees)
            .unwrap_or_else(FeeBreakdown::zero)
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::external_transfer(TransactionType::Transfer, Some(SUBTYPE_EXTERNAL_TRANSFER), 25)]
    #[case::internal_transfer(TransactionType::Transfer, None, 0)]
    #[case::bill_payment(TransactionType::Payment, Some("bill_payment"), 0)]
    #[case::withdrawal(TransactionType::Withdrawal, None, 0)]
    #[case::deposit(TransactionType::Deposit, None, 0)]
    fn test_standard_policy(
        #[case] tx_type: TransactionType,
        #[case] subtype: Option<&str>,
        #[case] expected_total: u64,
    ) {
        let fees = FeePolicy::standard().compute_fees(tx_type, subtype);
        assert_eq!(fees.total, Decimal::from(expected_total));
    }

    #[test]
    fn test_rules_are_additive() {
        let policy = FeePolicy::standard().with_rule(
            TransactionType::Payment,
            Some("bill_payment"),
            FeeBreakdown::new(Decimal::from(10), Decimal::from(2), Decimal::ZERO),
        );

        let bill = policy.compute_fees(TransactionType::Payment, Some("bill_payment"));
        assert_eq!(bill.total, Decimal::from(12));

        // the original external-transfer rule is untouched
        let external =
            policy.compute_fees(TransactionType::Transfer, Some(SUBTYPE_EXTERNAL_TRANSFER));
        assert_eq!(external.total, Decimal::from(25));
    }

    #[test]
    fn test_compute_fees_is_pure() {
        let policy = FeePolicy::standard();
        let first = policy.compute_fees(TransactionType::Transfer, Some(SUBTYPE_EXTERNAL_TRANSFER));
        let second =
            policy.compute_fees(TransactionType::Transfer, Some(SUBTYPE_EXTERNAL_TRANSFER));
        assert_eq!(first, second);
    }
}
