use super::money::{Amount, Currency};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type LoanId = u64;
pub type OwnerId = u32;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Due,
    Repaid,
}

/// Validated parameters of a loan that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanDraft {
    pub owner: OwnerId,
    pub amount: Amount,
    pub currency: Currency,
    pub terms: u32,
    pub processed_at: NaiveDate,
}

/// A disbursed loan.
///
/// `outstanding_amount` is only ever lowered by the status tracker after a
/// repayment; it starts equal to the principal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Loan {
    pub id: LoanId,
    pub owner: OwnerId,
    pub amount: Amount,
    pub terms: u32,
    pub outstanding_amount: u64,
    pub currency: Currency,
    pub processed_at: NaiveDate,
    pub status: LoanStatus,
}

impl Loan {
    /// Builds the freshly disbursed loan for `draft` under the given id.
    pub fn disburse(id: LoanId, draft: LoanDraft) -> Self {
        Self {
            id,
            owner: draft.owner,
            amount: draft.amount,
            terms: draft.terms,
            outstanding_amount: draft.amount.value(),
            currency: draft.currency,
            processed_at: draft.processed_at,
            status: LoanStatus::Due,
        }
    }

    pub fn is_repaid(&self) -> bool {
        self.status == LoanStatus::Repaid
    }
}
