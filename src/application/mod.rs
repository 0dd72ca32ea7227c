//! Application layer orchestrating the loan ledger.
//!
//! This module defines the `LoanService`, the entry point for disbursing and
//! repaying loans. It validates input, then drives the schedule generator,
//! the allocator and the status tracker inside store transactions.

pub mod service;
