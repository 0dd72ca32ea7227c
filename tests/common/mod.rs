#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use loanbook::application::service::LoanService;
use loanbook::config::LedgerConfig;
use loanbook::domain::allocation::AllocationMode;
use loanbook::domain::installment::ScheduledInstallment;
use loanbook::domain::loan::{Loan, LoanDraft, LoanId};
use loanbook::domain::money::{Amount, Currency};
use loanbook::domain::payment::ReceivedPayment;
use loanbook::domain::ports::{LoanStore, LoanTransaction, LockScope};
use loanbook::domain::schedule::ScheduleEntry;
use loanbook::error::{LoanError, Result};
use loanbook::infrastructure::in_memory::InMemoryLoanStore;
use std::io::Write;
use tempfile::NamedTempFile;

pub const COMMAND_HEADER: &str = "type, owner, loan, amount, currency, terms, date";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn config(mode: AllocationMode) -> LedgerConfig {
    LedgerConfig {
        allocation: mode,
        ..LedgerConfig::default()
    }
}

pub fn service(mode: AllocationMode) -> LoanService {
    LoanService::new(Box::new(InMemoryLoanStore::new()), config(mode))
}

/// Writes a command file with the standard header followed by `rows`.
pub fn command_file(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{COMMAND_HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file
}

/// Where a [`FaultyStore`] transaction fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    CreateInstallment,
    SaveInstallment,
    SaveLoan,
    Commit,
}

/// Wraps an in-memory store and injects a failure at one step of every
/// transaction.
pub struct FaultyStore {
    inner: InMemoryLoanStore,
    fault: FaultPoint,
}

impl FaultyStore {
    pub fn new(inner: InMemoryLoanStore, fault: FaultPoint) -> Self {
        Self { inner, fault }
    }
}

fn injected(point: FaultPoint) -> LoanError {
    LoanError::TransactionError(format!("injected failure at {point:?}"))
}

#[async_trait]
impl LoanStore for FaultyStore {
    async fn begin(&self, scope: LockScope) -> Result<Box<dyn LoanTransaction>> {
        let inner = self.inner.begin(scope).await?;
        Ok(Box::new(FaultyTransaction {
            inner,
            fault: self.fault,
        }))
    }

    async fn get_loan(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        self.inner.get_loan(loan_id).await
    }

    async fn installments(&self, loan_id: LoanId) -> Result<Vec<ScheduledInstallment>> {
        LoanStore::installments(&self.inner, loan_id).await
    }

    async fn payments(&self, loan_id: LoanId) -> Result<Vec<ReceivedPayment>> {
        self.inner.payments(loan_id).await
    }

    async fn all_loans(&self) -> Result<Vec<Loan>> {
        self.inner.all_loans().await
    }
}

struct FaultyTransaction {
    inner: Box<dyn LoanTransaction>,
    fault: FaultPoint,
}

#[async_trait]
impl LoanTransaction for FaultyTransaction {
    async fn create_loan(&mut self, draft: LoanDraft) -> Result<Loan> {
        self.inner.create_loan(draft).await
    }

    async fn create_installment(
        &mut self,
        loan: &Loan,
        entry: ScheduleEntry,
    ) -> Result<ScheduledInstallment> {
        let installment = self.inner.create_installment(loan, entry).await?;
        // Fail once part of the schedule is already staged.
        if self.fault == FaultPoint::CreateInstallment && installment.id % 2 == 0 {
            return Err(injected(self.fault));
        }
        Ok(installment)
    }

    async fn find_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        self.inner.find_loan(loan_id).await
    }

    async fn installments(&mut self, loan_id: LoanId) -> Result<Vec<ScheduledInstallment>> {
        self.inner.installments(loan_id).await
    }

    async fn save_installment(&mut self, installment: ScheduledInstallment) -> Result<()> {
        self.inner.save_installment(installment).await?;
        if self.fault == FaultPoint::SaveInstallment {
            return Err(injected(self.fault));
        }
        Ok(())
    }

    async fn save_loan(&mut self, loan: Loan) -> Result<()> {
        if self.fault == FaultPoint::SaveLoan {
            return Err(injected(self.fault));
        }
        self.inner.save_loan(loan).await
    }

    async fn create_received_payment(
        &mut self,
        loan_id: LoanId,
        amount: Amount,
        currency: Currency,
        received_at: NaiveDate,
    ) -> Result<ReceivedPayment> {
        self.inner
            .create_received_payment(loan_id, amount, currency, received_at)
            .await
    }

    async fn commit(&mut self) -> Result<()> {
        if self.fault == FaultPoint::Commit {
            self.inner.rollback().await;
            return Err(injected(self.fault));
        }
        self.inner.commit().await
    }

    async fn rollback(&mut self) {
        self.inner.rollback().await;
    }
}
