//! Adapters between the loan service and the outside world.

pub mod csv;
