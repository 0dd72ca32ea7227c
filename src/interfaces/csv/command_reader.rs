use crate::application::service::{LoanService, Repayment};
use crate::domain::loan::{Loan, LoanId, OwnerId};
use crate::domain::money::Currency;
use crate::error::{LoanError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Create,
    Repay,
}

/// One row of the command file.
///
/// `create` rows need `owner` and `terms`; `repay` rows need `loan`.
/// The currency stays a string here so an unknown code is reported as a
/// validation failure rather than a malformed row.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct LoanCommand {
    pub r#type: CommandType,
    pub owner: Option<OwnerId>,
    pub loan: Option<LoanId>,
    pub amount: i64,
    pub currency: String,
    pub terms: Option<u32>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Created(Loan),
    Repaid(Repayment),
}

impl LoanCommand {
    /// Runs the command against `service`.
    pub async fn apply(self, service: &LoanService) -> Result<CommandOutcome> {
        let currency: Currency = self.currency.parse()?;
        match self.r#type {
            CommandType::Create => {
                let owner = self
                    .owner
                    .ok_or_else(|| LoanError::validation("create requires an owner"))?;
                let terms = self
                    .terms
                    .ok_or_else(|| LoanError::validation("create requires a term count"))?;
                let loan = service
                    .create_loan(owner, self.amount, currency, terms, self.date)
                    .await?;
                Ok(CommandOutcome::Created(loan))
            }
            CommandType::Repay => {
                let loan_id = self
                    .loan
                    .ok_or_else(|| LoanError::validation("repay requires a loan id"))?;
                let repayment = service
                    .repay_loan(loan_id, self.amount, currency, self.date)
                    .await?;
                Ok(CommandOutcome::Repaid(repayment))
            }
        }
    }
}

/// Reads loan commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<LoanCommand>`. It trims whitespace and accepts short records.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes commands.
    pub fn commands(self) -> impl Iterator<Item = Result<LoanCommand>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LoanError::from))
    }
}
