use super::money::Amount;
use crate::error::{LoanError, Result};
use chrono::{Months, NaiveDate};

/// One generated row of a repayment schedule, before it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub amount: u64,
    pub due_date: NaiveDate,
}

/// Splits `principal` into `terms` monthly installments.
///
/// Every installment but the last gets `floor(principal / terms)`; the last
/// absorbs the remainder so the amounts always sum to the principal.
/// Installment `i` (1-indexed) falls due `i` calendar months after `start`,
/// with the day clamped to the end of shorter months.
pub fn generate_schedule(
    principal: Amount,
    terms: u32,
    allowed_terms: &[u32],
    start: NaiveDate,
) -> Result<Vec<ScheduleEntry>> {
    if terms == 0 || !allowed_terms.contains(&terms) {
        return Err(LoanError::validation(format!(
            "Unsupported term count {terms}, expected one of {allowed_terms:?}"
        )));
    }

    let principal = principal.value();
    let count = u64::from(terms);
    let base = principal / count;
    let last = principal - base * (count - 1);

    (1..=terms)
        .map(|month| -> Result<ScheduleEntry> {
            let due_date = start
                .checked_add_months(Months::new(month))
                .ok_or_else(|| {
                    LoanError::validation(format!("Due date out of range for month {month}"))
                })?;
            let amount = if month == terms { last } else { base };
            Ok(ScheduleEntry { amount, due_date })
        })
        .collect()
}
