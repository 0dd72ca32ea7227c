use crate::error::{LoanError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A strictly positive monetary amount in minor currency units.
///
/// Principals and payments are always built through [`Amount::new`], so a
/// zero or negative value never reaches the schedule generator or the
/// allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u64")]
pub struct Amount(u64);

impl Amount {
    pub fn new(value: i64) -> Result<Self> {
        if value > 0 {
            Ok(Self(value as u64))
        } else {
            Err(LoanError::validation("Amount must be positive"))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = LoanError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for u64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Currency tag. Only compared for equality, never converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Sgd,
    Vnd,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Sgd => "SGD",
            Currency::Vnd => "VND",
        }
    }
}

impl FromStr for Currency {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SGD" => Ok(Currency::Sgd),
            "VND" => Ok(Currency::Vnd),
            other => Err(LoanError::validation(format!(
                "Unsupported currency: {other}"
            ))),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
