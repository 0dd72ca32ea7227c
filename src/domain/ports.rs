use super::installment::ScheduledInstallment;
use super::loan::{Loan, LoanDraft, LoanId};
use super::money::{Amount, Currency};
use super::payment::ReceivedPayment;
use super::schedule::ScheduleEntry;
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::future::Future;
use std::pin::Pin;

/// What a transaction must hold exclusively while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockScope {
    /// Serializes against every other transaction on the same loan.
    Loan(LoanId),
    /// Creates a new loan; nothing else can observe it until commit.
    NewLoan,
}

/// One atomic unit of work against the loan ledger.
///
/// Writes are only visible to this transaction until [`commit`] succeeds.
/// Dropping a transaction without committing discards them.
///
/// [`commit`]: LoanTransaction::commit
#[async_trait]
pub trait LoanTransaction: Send {
    async fn create_loan(&mut self, draft: LoanDraft) -> Result<Loan>;
    async fn create_installment(
        &mut self,
        loan: &Loan,
        entry: ScheduleEntry,
    ) -> Result<ScheduledInstallment>;
    async fn find_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>>;
    /// Every installment of the loan, ascending by id.
    async fn installments(&mut self, loan_id: LoanId) -> Result<Vec<ScheduledInstallment>>;
    async fn save_installment(&mut self, installment: ScheduledInstallment) -> Result<()>;
    async fn save_loan(&mut self, loan: Loan) -> Result<()>;
    async fn create_received_payment(
        &mut self,
        loan_id: LoanId,
        amount: Amount,
        currency: Currency,
        received_at: NaiveDate,
    ) -> Result<ReceivedPayment>;
    async fn commit(&mut self) -> Result<()>;
    async fn rollback(&mut self);

    /// Installments that still carry a balance, oldest first.
    async fn find_due_installments(
        &mut self,
        loan_id: LoanId,
    ) -> Result<Vec<ScheduledInstallment>> {
        let mut due: Vec<_> = self
            .installments(loan_id)
            .await?
            .into_iter()
            .filter(ScheduledInstallment::is_open)
            .collect();
        due.sort_by_key(|inst| (inst.id, inst.due_date));
        Ok(due)
    }
}

#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn begin(&self, scope: LockScope) -> Result<Box<dyn LoanTransaction>>;
    async fn get_loan(&self, loan_id: LoanId) -> Result<Option<Loan>>;
    async fn installments(&self, loan_id: LoanId) -> Result<Vec<ScheduledInstallment>>;
    async fn payments(&self, loan_id: LoanId) -> Result<Vec<ReceivedPayment>>;
    async fn all_loans(&self) -> Result<Vec<Loan>>;
}

pub type LoanStoreBox = Box<dyn LoanStore>;

pub type TxFuture<'t, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 't>>;

/// Runs `work` inside a transaction on `store`.
///
/// Commits when `work` returns `Ok`, rolls back when it returns `Err`, and
/// returns the error unchanged either way.
pub async fn with_transaction<T, F>(store: &dyn LoanStore, scope: LockScope, work: F) -> Result<T>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn LoanTransaction) -> TxFuture<'t, T> + Send,
{
    let mut tx = store.begin(scope).await?;
    let outcome = {
        let unit: &mut dyn LoanTransaction = &mut *tx;
        work(unit).await
    };

    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            tx.rollback().await;
            Err(err)
        }
    }
}
