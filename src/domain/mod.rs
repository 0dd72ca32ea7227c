//! Loan ledger domain: entities, the schedule generator, the repayment
//! allocator, the status tracker and the persistence ports they rely on.

pub mod allocation;
pub mod installment;
pub mod loan;
pub mod money;
pub mod payment;
pub mod ports;
pub mod schedule;
pub mod tracker;
