use super::installment::{InstallmentStatus, ScheduledInstallment};
use super::loan::{Loan, LoanStatus};
use super::money::Amount;

/// Recomputes a loan's balance and status after a repayment.
///
/// The balance drops by the full payment, whatever the allocator did with it.
/// Once no installment is left in the `Due` state the loan is settled: its
/// balance is forced to zero and it becomes `Repaid`.
pub fn update_loan_after_payment(
    loan: &mut Loan,
    payment: Amount,
    installments: &[ScheduledInstallment],
) {
    loan.outstanding_amount = loan.outstanding_amount.saturating_sub(payment.value());

    let still_due = installments
        .iter()
        .filter(|inst| inst.status == InstallmentStatus::Due)
        .count();

    if still_due == 0 {
        loan.outstanding_amount = 0;
        loan.status = LoanStatus::Repaid;
    } else {
        loan.status = LoanStatus::Due;
    }
}
