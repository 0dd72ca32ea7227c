use super::loan::LoanId;
use super::money::{Amount, Currency};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type PaymentId = u64;

/// Money received against a loan. Written once, never updated.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ReceivedPayment {
    pub id: PaymentId,
    pub loan_id: LoanId,
    pub amount: Amount,
    pub currency: Currency,
    pub received_at: NaiveDate,
}
