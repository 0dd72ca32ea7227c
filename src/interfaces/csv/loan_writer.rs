use crate::domain::installment::{InstallmentStatus, ScheduledInstallment};
use crate::domain::loan::{Loan, LoanStatus};
use crate::domain::money::Currency;
use crate::error::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;

const LOAN_HEADER: [&str; 8] = [
    "loan",
    "owner",
    "amount",
    "outstanding",
    "currency",
    "terms",
    "processed_at",
    "status",
];

const INSTALLMENT_HEADER: [&str; 7] = [
    "installment",
    "loan",
    "amount",
    "outstanding",
    "currency",
    "due_date",
    "status",
];

#[derive(Serialize)]
struct LoanRecord {
    loan: u64,
    owner: u32,
    amount: u64,
    outstanding: u64,
    currency: Currency,
    terms: u32,
    processed_at: NaiveDate,
    status: LoanStatus,
}

impl From<&Loan> for LoanRecord {
    fn from(loan: &Loan) -> Self {
        Self {
            loan: loan.id,
            owner: loan.owner,
            amount: loan.amount.value(),
            outstanding: loan.outstanding_amount,
            currency: loan.currency,
            terms: loan.terms,
            processed_at: loan.processed_at,
            status: loan.status,
        }
    }
}

#[derive(Serialize)]
struct InstallmentRecord {
    installment: u64,
    loan: u64,
    amount: u64,
    outstanding: u64,
    currency: Currency,
    due_date: NaiveDate,
    status: InstallmentStatus,
}

impl From<&ScheduledInstallment> for InstallmentRecord {
    fn from(inst: &ScheduledInstallment) -> Self {
        Self {
            installment: inst.id,
            loan: inst.loan_id,
            amount: inst.amount,
            outstanding: inst.outstanding_amount,
            currency: inst.currency,
            due_date: inst.due_date,
            status: inst.status,
        }
    }
}

/// Writes loan and installment tables as CSV.
///
/// Each table starts with its own header row, so both can share one output.
pub struct LoanWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LoanWriter<W> {
    pub fn new(destination: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(destination);
        Self { writer }
    }

    pub fn write_loans<'a>(&mut self, loans: impl IntoIterator<Item = &'a Loan>) -> Result<()> {
        self.writer.write_record(LOAN_HEADER)?;
        for loan in loans {
            self.writer.serialize(LoanRecord::from(loan))?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_installments<'a>(
        &mut self,
        installments: impl IntoIterator<Item = &'a ScheduledInstallment>,
    ) -> Result<()> {
        self.writer.write_record(INSTALLMENT_HEADER)?;
        for inst in installments {
            self.writer.serialize(InstallmentRecord::from(inst))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
