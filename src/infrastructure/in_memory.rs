use super::locks::{LoanLockGuard, LoanLocks};
use super::staging::{Sequences, Tables};
use crate::domain::installment::ScheduledInstallment;
use crate::domain::loan::{Loan, LoanDraft, LoanId};
use crate::domain::money::{Amount, Currency};
use crate::domain::payment::ReceivedPayment;
use crate::domain::ports::{LoanStore, LoanTransaction, LockScope};
use crate::domain::schedule::ScheduleEntry;
use crate::error::{LoanError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// A thread-safe in-memory loan ledger.
///
/// Committed rows live in `Arc<RwLock<Tables>>`. Transactions stage their
/// writes privately and apply them under a single write lock on commit, so
/// readers never see half of a repayment. Ideal for tests and one-shot runs.
#[derive(Default, Clone)]
pub struct InMemoryLoanStore {
    tables: Arc<RwLock<Tables>>,
    sequences: Arc<Sequences>,
    locks: LoanLocks,
}

impl InMemoryLoanStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.locks = LoanLocks::new(timeout);
        self
    }
}

#[async_trait]
impl LoanStore for InMemoryLoanStore {
    async fn begin(&self, scope: LockScope) -> Result<Box<dyn LoanTransaction>> {
        let guard = match scope {
            LockScope::Loan(loan_id) => Some(self.locks.acquire(loan_id).await?),
            LockScope::NewLoan => None,
        };

        Ok(Box::new(InMemoryTransaction {
            tables: Arc::clone(&self.tables),
            sequences: Arc::clone(&self.sequences),
            staged: Tables::default(),
            guard,
            finished: false,
        }))
    }

    async fn get_loan(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let tables = self.tables.read().await;
        Ok(tables.loans.get(&loan_id).cloned())
    }

    async fn installments(&self, loan_id: LoanId) -> Result<Vec<ScheduledInstallment>> {
        let tables = self.tables.read().await;
        Ok(tables.installments_of(loan_id))
    }

    async fn payments(&self, loan_id: LoanId) -> Result<Vec<ReceivedPayment>> {
        let tables = self.tables.read().await;
        Ok(tables.payments_of(loan_id))
    }

    async fn all_loans(&self) -> Result<Vec<Loan>> {
        let tables = self.tables.read().await;
        Ok(tables.loans.values().cloned().collect())
    }
}

pub struct InMemoryTransaction {
    tables: Arc<RwLock<Tables>>,
    sequences: Arc<Sequences>,
    staged: Tables,
    guard: Option<LoanLockGuard>,
    finished: bool,
}

impl InMemoryTransaction {
    fn ensure_active(&self) -> Result<()> {
        if self.finished {
            Err(LoanError::TransactionError(
                "Transaction already finished".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.guard = None;
    }
}

#[async_trait]
impl LoanTransaction for InMemoryTransaction {
    async fn create_loan(&mut self, draft: LoanDraft) -> Result<Loan> {
        self.ensure_active()?;
        let loan = Loan::disburse(self.sequences.next_loan(), draft);
        self.staged.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn create_installment(
        &mut self,
        loan: &Loan,
        entry: ScheduleEntry,
    ) -> Result<ScheduledInstallment> {
        self.ensure_active()?;
        let installment = ScheduledInstallment::new(
            self.sequences.next_installment(),
            loan.id,
            entry.amount,
            loan.currency,
            entry.due_date,
        );
        self.staged
            .installments
            .insert(installment.id, installment.clone());
        Ok(installment)
    }

    async fn find_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        self.ensure_active()?;
        if let Some(loan) = self.staged.loans.get(&loan_id) {
            return Ok(Some(loan.clone()));
        }
        let tables = self.tables.read().await;
        Ok(tables.loans.get(&loan_id).cloned())
    }

    async fn installments(&mut self, loan_id: LoanId) -> Result<Vec<ScheduledInstallment>> {
        self.ensure_active()?;
        let base = self.tables.read().await.installments_of(loan_id);
        Ok(self.staged.overlay_installments(loan_id, base))
    }

    async fn save_installment(&mut self, installment: ScheduledInstallment) -> Result<()> {
        self.ensure_active()?;
        self.staged.installments.insert(installment.id, installment);
        Ok(())
    }

    async fn save_loan(&mut self, loan: Loan) -> Result<()> {
        self.ensure_active()?;
        self.staged.loans.insert(loan.id, loan);
        Ok(())
    }

    async fn create_received_payment(
        &mut self,
        loan_id: LoanId,
        amount: Amount,
        currency: Currency,
        received_at: NaiveDate,
    ) -> Result<ReceivedPayment> {
        self.ensure_active()?;
        let payment = ReceivedPayment {
            id: self.sequences.next_payment(),
            loan_id,
            amount,
            currency,
            received_at,
        };
        self.staged.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;
        let staged = std::mem::take(&mut self.staged);
        if !staged.is_empty() {
            let mut tables = self.tables.write().await;
            tables.absorb(staged);
        }
        self.finish();
        Ok(())
    }

    async fn rollback(&mut self) {
        self.staged = Tables::default();
        self.finish();
    }
}
