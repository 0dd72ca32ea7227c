//! Building blocks shared by the store backends: the table set used both as
//! the in-memory ledger and as a transaction's write overlay, and the id
//! sequences.

use crate::domain::installment::{InstallmentId, ScheduledInstallment};
use crate::domain::loan::{Loan, LoanId};
use crate::domain::payment::{PaymentId, ReceivedPayment};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default, Clone)]
pub struct Tables {
    pub loans: BTreeMap<LoanId, Loan>,
    pub installments: BTreeMap<InstallmentId, ScheduledInstallment>,
    pub payments: BTreeMap<PaymentId, ReceivedPayment>,
}

impl Tables {
    pub fn is_empty(&self) -> bool {
        self.loans.is_empty() && self.installments.is_empty() && self.payments.is_empty()
    }

    pub fn installments_of(&self, loan_id: LoanId) -> Vec<ScheduledInstallment> {
        self.installments
            .values()
            .filter(|inst| inst.loan_id == loan_id)
            .cloned()
            .collect()
    }

    pub fn payments_of(&self, loan_id: LoanId) -> Vec<ReceivedPayment> {
        self.payments
            .values()
            .filter(|payment| payment.loan_id == loan_id)
            .cloned()
            .collect()
    }

    /// Layers this overlay's installments for `loan_id` on top of `base`.
    pub fn overlay_installments(
        &self,
        loan_id: LoanId,
        base: Vec<ScheduledInstallment>,
    ) -> Vec<ScheduledInstallment> {
        let mut merged: BTreeMap<InstallmentId, ScheduledInstallment> =
            base.into_iter().map(|inst| (inst.id, inst)).collect();
        for inst in self.installments_of(loan_id) {
            merged.insert(inst.id, inst);
        }
        let mut merged: Vec<_> = merged.into_values().collect();
        merged.sort_by_key(|inst| (inst.id, inst.due_date));
        merged
    }

    /// Moves every row of `other` into `self`, replacing rows with the same id.
    pub fn absorb(&mut self, other: Tables) {
        self.loans.extend(other.loans);
        self.installments.extend(other.installments);
        self.payments.extend(other.payments);
    }
}

/// Monotonic id generators. Ids handed to rolled-back transactions are not
/// reused.
#[derive(Debug)]
pub struct Sequences {
    loans: AtomicU64,
    installments: AtomicU64,
    payments: AtomicU64,
}

impl Default for Sequences {
    fn default() -> Self {
        Self::starting_after(0, 0, 0)
    }
}

impl Sequences {
    /// Sequences whose next ids follow the given highest ids in use.
    pub fn starting_after(loan: u64, installment: u64, payment: u64) -> Self {
        Self {
            loans: AtomicU64::new(loan + 1),
            installments: AtomicU64::new(installment + 1),
            payments: AtomicU64::new(payment + 1),
        }
    }

    pub fn next_loan(&self) -> LoanId {
        self.loans.fetch_add(1, Ordering::SeqCst)
    }

    pub fn next_installment(&self) -> InstallmentId {
        self.installments.fetch_add(1, Ordering::SeqCst)
    }

    pub fn next_payment(&self) -> PaymentId {
        self.payments.fetch_add(1, Ordering::SeqCst)
    }
}
