use loanbook::application::service::AllocationOutcome;
use loanbook::domain::allocation::AllocationMode;
use loanbook::domain::installment::InstallmentStatus;
use loanbook::domain::loan::LoanStatus;
use loanbook::domain::money::Currency;
use loanbook::error::LoanError;

mod common;
use common::{date, service};

#[tokio::test]
async fn test_uneven_principal_schedule() {
    let service = service(AllocationMode::Corrected);
    let loan = service
        .create_loan(1, 100, Currency::Sgd, 3, date(2024, 1, 15))
        .await
        .unwrap();

    let schedule = service.schedule(loan.id).await.unwrap();
    let rows: Vec<_> = schedule.iter().map(|i| (i.amount, i.due_date)).collect();
    assert_eq!(
        rows,
        vec![
            (33, date(2024, 2, 15)),
            (33, date(2024, 3, 15)),
            (34, date(2024, 4, 15)),
        ]
    );
    assert!(schedule.iter().all(|i| i.status == InstallmentStatus::Due));
}

#[tokio::test]
async fn test_small_principal_schedule() {
    let service = service(AllocationMode::Corrected);
    let loan = service
        .create_loan(1, 10, Currency::Vnd, 3, date(2024, 1, 15))
        .await
        .unwrap();

    let amounts: Vec<_> = service
        .schedule(loan.id)
        .await
        .unwrap()
        .iter()
        .map(|i| i.amount)
        .collect();
    assert_eq!(amounts, vec![3, 3, 4]);
    assert_eq!(amounts.iter().sum::<u64>(), 10);
}

#[tokio::test]
async fn test_repay_first_installment_then_overpay() {
    for mode in [AllocationMode::Literal, AllocationMode::Corrected] {
        let service = service(mode);
        let loan = service
            .create_loan(1, 100, Currency::Sgd, 3, date(2024, 1, 15))
            .await
            .unwrap();

        let first = service
            .repay_loan(loan.id, 33, Currency::Sgd, date(2024, 2, 15))
            .await
            .unwrap();
        assert_eq!(first.loan.outstanding_amount, 67);
        assert_eq!(first.loan.status, LoanStatus::Due);
        let schedule = service.schedule(loan.id).await.unwrap();
        assert_eq!(schedule[0].outstanding_amount, 0);
        assert_eq!(schedule[0].status, InstallmentStatus::Repaid);
        assert_eq!(schedule[1].status, InstallmentStatus::Due);

        let second = service
            .repay_loan(loan.id, 200, Currency::Sgd, date(2024, 3, 15))
            .await
            .unwrap();
        assert_eq!(second.loan.outstanding_amount, 0);
        assert_eq!(second.loan.status, LoanStatus::Repaid);

        let schedule = service.schedule(loan.id).await.unwrap();
        assert_eq!(schedule.len(), 3, "surplus must not create installments");
        assert!(
            schedule
                .iter()
                .all(|i| i.status == InstallmentStatus::Repaid && i.outstanding_amount == 0)
        );

        let payments = service.payments(loan.id).await.unwrap();
        let amounts: Vec<_> = payments.iter().map(|p| p.amount.value()).collect();
        assert_eq!(amounts, vec![33, 200]);
    }
}

#[tokio::test]
async fn test_repay_settled_loan_is_noop() {
    let service = service(AllocationMode::Corrected);
    let loan = service
        .create_loan(1, 100, Currency::Sgd, 3, date(2024, 1, 15))
        .await
        .unwrap();
    service
        .repay_loan(loan.id, 100, Currency::Sgd, date(2024, 2, 15))
        .await
        .unwrap();
    let before = service.schedule(loan.id).await.unwrap();

    let repayment = service
        .repay_loan(loan.id, 25, Currency::Sgd, date(2024, 3, 15))
        .await
        .unwrap();

    assert!(repayment.is_noop());
    assert_eq!(repayment.outcome, AllocationOutcome::NoOp);
    assert_eq!(repayment.payment.amount.value(), 25);
    assert_eq!(repayment.payment.received_at, date(2024, 3, 15));
    assert_eq!(repayment.loan.status, LoanStatus::Repaid);
    assert_eq!(repayment.loan.outstanding_amount, 0);
    assert_eq!(service.schedule(loan.id).await.unwrap(), before);
    assert_eq!(service.payments(loan.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unsupported_term_count_rejected() {
    let service = service(AllocationMode::Corrected);
    let result = service
        .create_loan(1, 100, Currency::Sgd, 4, date(2024, 1, 15))
        .await;

    assert!(matches!(result, Err(LoanError::ValidationError(_))));
    assert!(service.loans().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_six_term_loan_with_configured_terms() {
    let service = service(AllocationMode::Corrected);
    let loan = service
        .create_loan(2, 1_000, Currency::Vnd, 6, date(2024, 8, 31))
        .await
        .unwrap();

    let schedule = service.schedule(loan.id).await.unwrap();
    let amounts: Vec<_> = schedule.iter().map(|i| i.amount).collect();
    assert_eq!(amounts, vec![166, 166, 166, 166, 166, 170]);
    assert_eq!(schedule[0].due_date, date(2024, 9, 30));
    assert_eq!(schedule[5].due_date, date(2025, 2, 28));
}

#[tokio::test]
async fn test_earliest_installment_consumed_first() {
    let service = service(AllocationMode::Corrected);
    let loan = service
        .create_loan(1, 90, Currency::Sgd, 3, date(2024, 1, 15))
        .await
        .unwrap();

    for (amount, expected) in [(10, vec![20, 30, 30]), (25, vec![0, 25, 30]), (30, vec![0, 0, 25])] {
        service
            .repay_loan(loan.id, amount, Currency::Sgd, date(2024, 2, 1))
            .await
            .unwrap();
        let outstanding: Vec<_> = service
            .schedule(loan.id)
            .await
            .unwrap()
            .iter()
            .map(|i| i.outstanding_amount)
            .collect();
        assert_eq!(outstanding, expected);
    }
}
