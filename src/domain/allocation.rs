use super::installment::ScheduledInstallment;
use super::money::Amount;
use crate::error::{LoanError, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the running payment balance is reduced after each installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationMode {
    /// Subtracts the installment's original amount plus its new outstanding
    /// amount, reproducing the legacy ledger's arithmetic.
    Literal,
    /// Subtracts exactly what was applied to the installment.
    #[default]
    Corrected,
}

impl FromStr for AllocationMode {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "literal" => Ok(AllocationMode::Literal),
            "corrected" => Ok(AllocationMode::Corrected),
            other => Err(LoanError::ConfigError(format!(
                "Unknown allocation mode: {other}"
            ))),
        }
    }
}

impl fmt::Display for AllocationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationMode::Literal => f.write_str("literal"),
            AllocationMode::Corrected => f.write_str("corrected"),
        }
    }
}

/// Result of spreading one payment over a loan's installments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Allocation {
    /// Installments whose balance changed, in the order they were visited.
    pub updated: Vec<ScheduledInstallment>,
    /// Total reduction of installment balances.
    pub applied: u64,
    /// Part of the payment no installment absorbed. It is discarded.
    pub unapplied: u64,
}

impl Allocation {
    pub fn is_noop(&self) -> bool {
        self.updated.is_empty()
    }
}

/// Applies `payment` to `installments`, oldest first.
///
/// Installments are ordered by id, then due date. Only installments that
/// still carry a balance and are not repaid take part. Whatever is left once
/// every eligible installment is settled is reported as `unapplied`.
pub fn allocate(
    installments: &mut [ScheduledInstallment],
    payment: Amount,
    mode: AllocationMode,
) -> Allocation {
    installments.sort_by_key(|inst| (inst.id, inst.due_date));

    let mut allocation = Allocation::default();
    let mut remaining = i128::from(payment.value());

    for inst in installments.iter_mut().filter(|inst| inst.is_open()) {
        if remaining <= 0 {
            break;
        }

        let before = inst.outstanding_amount;
        let new_outstanding = i128::from(before) - remaining;
        // new_outstanding lies in [0, before) here, so the cast is lossless.
        inst.set_outstanding(new_outstanding.max(0) as u64);
        let applied = before - inst.outstanding_amount;

        remaining -= match mode {
            AllocationMode::Literal => {
                i128::from(inst.amount) + i128::from(inst.outstanding_amount)
            }
            AllocationMode::Corrected => i128::from(applied),
        };

        debug!(
            "installment {} of loan {}: applied {}, outstanding {} -> {} ({:?})",
            inst.id, inst.loan_id, applied, before, inst.outstanding_amount, inst.status
        );

        allocation.applied += applied;
        allocation.updated.push(inst.clone());
    }

    allocation.unapplied = payment.value() - allocation.applied;
    allocation
}
