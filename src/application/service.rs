use crate::config::LedgerConfig;
use crate::domain::allocation::{Allocation, AllocationMode, allocate};
use crate::domain::installment::ScheduledInstallment;
use crate::domain::loan::{Loan, LoanDraft, LoanId, OwnerId};
use crate::domain::money::{Amount, Currency};
use crate::domain::payment::ReceivedPayment;
use crate::domain::ports::{LoanStoreBox, LoanTransaction, LockScope, with_transaction};
use crate::domain::schedule::{ScheduleEntry, generate_schedule};
use crate::domain::tracker::update_loan_after_payment;
use crate::error::{LoanError, Result};
use chrono::NaiveDate;
use log::{info, warn};

/// How a repayment was spread over the loan's installments.
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationOutcome {
    Applied {
        installments: Vec<ScheduledInstallment>,
        applied: u64,
        unapplied: u64,
    },
    /// The payment was recorded but no installment was left to absorb it.
    NoOp,
}

impl From<Allocation> for AllocationOutcome {
    fn from(allocation: Allocation) -> Self {
        if allocation.is_noop() {
            AllocationOutcome::NoOp
        } else {
            AllocationOutcome::Applied {
                installments: allocation.updated,
                applied: allocation.applied,
                unapplied: allocation.unapplied,
            }
        }
    }
}

/// The committed result of [`LoanService::repay_loan`].
#[derive(Debug, Clone, PartialEq)]
pub struct Repayment {
    pub payment: ReceivedPayment,
    pub loan: Loan,
    pub outcome: AllocationOutcome,
}

impl Repayment {
    pub fn is_noop(&self) -> bool {
        self.outcome == AllocationOutcome::NoOp
    }
}

/// Entry point for disbursing and repaying loans.
///
/// Every write goes through [`with_transaction`], so a loan is never visible
/// without its full schedule and a repayment is never half applied.
pub struct LoanService {
    store: LoanStoreBox,
    config: LedgerConfig,
}

impl LoanService {
    /// Creates a new `LoanService` over `store`.
    pub fn new(store: LoanStoreBox, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    /// Disburses a loan and persists it together with its installments.
    pub async fn create_loan(
        &self,
        owner: OwnerId,
        amount: i64,
        currency: Currency,
        terms: u32,
        processed_at: NaiveDate,
    ) -> Result<Loan> {
        let amount = Amount::new(amount)?;
        let schedule = generate_schedule(amount, terms, &self.config.allowed_terms, processed_at)?;
        let draft = LoanDraft {
            owner,
            amount,
            currency,
            terms,
            processed_at,
        };

        let loan = with_transaction(self.store.as_ref(), LockScope::NewLoan, move |tx| {
            Box::pin(disburse_within(tx, draft, schedule))
        })
        .await?;

        info!(
            "created loan {} for owner {}: {} {} over {} terms",
            loan.id, loan.owner, loan.amount, loan.currency, loan.terms
        );
        Ok(loan)
    }

    /// Records a payment against a loan and allocates it to its installments.
    ///
    /// The payment record, the installment updates and the loan update are
    /// committed together while holding the loan's lock.
    pub async fn repay_loan(
        &self,
        loan_id: LoanId,
        amount: i64,
        currency: Currency,
        received_at: NaiveDate,
    ) -> Result<Repayment> {
        let payment = Amount::new(amount)?;
        let mode = self.config.allocation;

        let repayment = with_transaction(self.store.as_ref(), LockScope::Loan(loan_id), move |tx| {
            Box::pin(repay_within(tx, loan_id, payment, currency, received_at, mode))
        })
        .await?;

        match &repayment.outcome {
            AllocationOutcome::NoOp => warn!(
                "payment {} on loan {} recorded but no installment was open",
                repayment.payment.id, loan_id
            ),
            AllocationOutcome::Applied {
                applied, unapplied, ..
            } => {
                info!(
                    "payment {} on loan {}: applied {}, loan outstanding {} ({:?})",
                    repayment.payment.id,
                    loan_id,
                    applied,
                    repayment.loan.outstanding_amount,
                    repayment.loan.status
                );
                if *unapplied > 0 {
                    warn!("discarded {} unapplied on loan {}", unapplied, loan_id);
                }
                if repayment.loan.is_repaid() {
                    info!("loan {} fully repaid", loan_id);
                }
            }
        }

        Ok(repayment)
    }

    pub async fn loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.store
            .get_loan(loan_id)
            .await?
            .ok_or(LoanError::LoanNotFound(loan_id))
    }

    /// The loan's installments, oldest first.
    pub async fn schedule(&self, loan_id: LoanId) -> Result<Vec<ScheduledInstallment>> {
        let mut installments = self.store.installments(loan_id).await?;
        installments.sort_by_key(|inst| (inst.id, inst.due_date));
        Ok(installments)
    }

    pub async fn payments(&self, loan_id: LoanId) -> Result<Vec<ReceivedPayment>> {
        let mut payments = self.store.payments(loan_id).await?;
        payments.sort_by_key(|payment| payment.id);
        Ok(payments)
    }

    /// All loans, ascending by id.
    pub async fn loans(&self) -> Result<Vec<Loan>> {
        let mut loans = self.store.all_loans().await?;
        loans.sort_by_key(|loan| loan.id);
        Ok(loans)
    }
}

async fn disburse_within(
    tx: &mut dyn LoanTransaction,
    draft: LoanDraft,
    schedule: Vec<ScheduleEntry>,
) -> Result<Loan> {
    let loan = tx.create_loan(draft).await?;
    for entry in schedule {
        tx.create_installment(&loan, entry).await?;
    }
    Ok(loan)
}

async fn repay_within(
    tx: &mut dyn LoanTransaction,
    loan_id: LoanId,
    payment: Amount,
    currency: Currency,
    received_at: NaiveDate,
    mode: AllocationMode,
) -> Result<Repayment> {
    let mut loan = tx
        .find_loan(loan_id)
        .await?
        .ok_or(LoanError::LoanNotFound(loan_id))?;
    if loan.currency != currency {
        return Err(LoanError::validation(format!(
            "Payment currency {} does not match loan currency {}",
            currency, loan.currency
        )));
    }

    let received = tx
        .create_received_payment(loan_id, payment, currency, received_at)
        .await?;

    let mut open = tx.find_due_installments(loan_id).await?;
    let allocation = allocate(&mut open, payment, mode);
    for installment in &allocation.updated {
        tx.save_installment(installment.clone()).await?;
    }

    let installments = tx.installments(loan_id).await?;
    update_loan_after_payment(&mut loan, payment, &installments);
    tx.save_loan(loan.clone()).await?;

    Ok(Repayment {
        payment: received,
        loan,
        outcome: allocation.into(),
    })
}
