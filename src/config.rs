use crate::domain::allocation::AllocationMode;
use crate::error::{LoanError, Result};
use crate::infrastructure::locks::DEFAULT_LOCK_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Term counts offered when nothing else is configured.
pub const DEFAULT_TERMS: [u32; 2] = [3, 6];

/// Ledger settings. Every field is optional in a config file.
///
/// ```json
/// { "allocation": "literal", "allowed_terms": [3, 6, 12], "lock_timeout_ms": 2000 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub allocation: AllocationMode,
    pub allowed_terms: Vec<u32>,
    pub lock_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            allocation: AllocationMode::default(),
            allowed_terms: DEFAULT_TERMS.to_vec(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT.as_millis() as u64,
        }
    }
}

impl LedgerConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| LoanError::ConfigError(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.allowed_terms.is_empty() {
            return Err(LoanError::ConfigError(
                "At least one term count must be allowed".to_string(),
            ));
        }
        if self.allowed_terms.contains(&0) {
            return Err(LoanError::ConfigError(
                "Term counts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
