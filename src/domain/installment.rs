use super::loan::LoanId;
use super::money::Currency;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type InstallmentId = u64;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Due,
    Partial,
    Repaid,
}

/// One due portion of a loan's principal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ScheduledInstallment {
    pub id: InstallmentId,
    pub loan_id: LoanId,
    /// Original amount, fixed when the schedule is generated.
    pub amount: u64,
    pub outstanding_amount: u64,
    pub currency: Currency,
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
}

impl ScheduledInstallment {
    pub fn new(
        id: InstallmentId,
        loan_id: LoanId,
        amount: u64,
        currency: Currency,
        due_date: NaiveDate,
    ) -> Self {
        let mut installment = Self {
            id,
            loan_id,
            amount,
            outstanding_amount: amount,
            currency,
            due_date,
            status: InstallmentStatus::Due,
        };
        // A zero-amount slot (principal below the term count) is settled from the start.
        installment.set_outstanding(amount);
        installment
    }

    /// Whether the allocator may still apply money to this installment.
    pub fn is_open(&self) -> bool {
        self.outstanding_amount > 0 && self.status != InstallmentStatus::Repaid
    }

    /// Sets the outstanding amount and derives the matching status.
    pub fn set_outstanding(&mut self, outstanding: u64) {
        self.outstanding_amount = outstanding.min(self.amount);
        self.status = if self.outstanding_amount == 0 {
            InstallmentStatus::Repaid
        } else if self.outstanding_amount < self.amount {
            InstallmentStatus::Partial
        } else {
            InstallmentStatus::Due
        };
    }
}
