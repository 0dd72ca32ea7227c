use crate::domain::loan::LoanId;
use crate::error::{LoanError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

type LockTable = HashMap<LoanId, Arc<tokio::sync::Mutex<()>>>;

/// Per-loan exclusive locks.
///
/// Transactions on the same loan queue behind each other; transactions on
/// different loans never contend. Waiting is bounded by `timeout`.
///
/// A loan's entry lives only while someone holds or waits for its lock.
#[derive(Clone)]
pub struct LoanLocks {
    locks: Arc<Mutex<LockTable>>,
    timeout: Duration,
}

impl Default for LoanLocks {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

impl LoanLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    pub async fn acquire(&self, loan_id: LoanId) -> Result<LoanLockGuard> {
        let lock = {
            let mut entries = table(&self.locks);
            Arc::clone(entries.entry(loan_id).or_default())
        };

        match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(LoanLockGuard {
                loan_id,
                guard: Some(guard),
                locks: Arc::clone(&self.locks),
            }),
            Err(_) => {
                release(&self.locks, loan_id);
                Err(LoanError::TransactionError(format!(
                    "Timed out after {:?} waiting for lock on loan {loan_id}",
                    self.timeout
                )))
            }
        }
    }
}

/// Holds a loan's lock; dropping it releases the lock.
pub struct LoanLockGuard {
    loan_id: LoanId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<Mutex<LockTable>>,
}

impl Drop for LoanLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        release(&self.locks, self.loan_id);
    }
}

// The table only holds plain Arcs, so a poisoned lock leaves it consistent.
fn table(locks: &Mutex<LockTable>) -> MutexGuard<'_, LockTable> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drops the loan's entry once the table holds the only reference to it.
fn release(locks: &Mutex<LockTable>, loan_id: LoanId) {
    let mut entries = table(locks);
    if entries
        .get(&loan_id)
        .is_some_and(|lock| Arc::strong_count(lock) == 1)
    {
        entries.remove(&loan_id);
    }
}
