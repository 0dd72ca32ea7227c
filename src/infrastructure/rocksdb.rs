use super::locks::{LoanLockGuard, LoanLocks};
use super::staging::{Sequences, Tables};
use crate::domain::installment::ScheduledInstallment;
use crate::domain::loan::{Loan, LoanDraft, LoanId};
use crate::domain::money::{Amount, Currency};
use crate::domain::payment::ReceivedPayment;
use crate::domain::ports::{LoanStore, LoanTransaction, LockScope};
use crate::domain::schedule::ScheduleEntry;
use crate::error::{LoanError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Column Family for loans, keyed by loan id.
pub const CF_LOANS: &str = "loans";
/// Column Family for installments, keyed by loan id then installment id.
pub const CF_INSTALLMENTS: &str = "installments";
/// Column Family for received payments, keyed by loan id then payment id.
pub const CF_PAYMENTS: &str = "payments";

/// A persistent loan ledger backed by RocksDB.
///
/// Loans, installments and payments live in separate Column Families and are
/// stored as JSON. Installment and payment keys are prefixed with the loan id
/// so a loan's rows are read with one ordered scan.
///
/// A transaction commits as a single `WriteBatch`, so a repayment is either
/// fully on disk or not at all.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    sequences: Arc<Sequences>,
    locks: LoanLocks,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures the column families exist and resumes id sequences after the
    /// highest ids already stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_LOANS, CF_INSTALLMENTS, CF_PAYMENTS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;
        let sequences = Sequences::starting_after(
            last_id(&db, CF_LOANS)?,
            last_id(&db, CF_INSTALLMENTS)?,
            last_id(&db, CF_PAYMENTS)?,
        );

        Ok(Self {
            db: Arc::new(db),
            sequences: Arc::new(sequences),
            locks: LoanLocks::default(),
        })
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.locks = LoanLocks::new(timeout);
        self
    }
}

fn column<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name).ok_or_else(|| {
        LoanError::InternalError(Box::new(std::io::Error::other(format!(
            "Column family {name} not found"
        ))))
    })
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        LoanError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        LoanError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

fn child_key(loan_id: LoanId, id: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&loan_id.to_be_bytes());
    key[8..].copy_from_slice(&id.to_be_bytes());
    key
}

/// Highest id stored in a column family; the id is the trailing 8 key bytes.
fn last_id(db: &DB, cf_name: &str) -> Result<u64> {
    let cf = column(db, cf_name)?;
    let mut highest = 0;
    for item in db.iterator_cf(cf, IteratorMode::Start) {
        let (key, _value) = item?;
        if key.len() >= 8 {
            let mut id = [0u8; 8];
            id.copy_from_slice(&key[key.len() - 8..]);
            highest = highest.max(u64::from_be_bytes(id));
        }
    }
    Ok(highest)
}

fn read_loan(db: &DB, loan_id: LoanId) -> Result<Option<Loan>> {
    let cf = column(db, CF_LOANS)?;
    match db.get_cf(cf, loan_id.to_be_bytes())? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn read_children<T: DeserializeOwned>(db: &DB, cf_name: &str, loan_id: LoanId) -> Result<Vec<T>> {
    let cf = column(db, cf_name)?;
    let prefix = loan_id.to_be_bytes();
    let mut rows = Vec::new();

    for item in db.iterator_cf(cf, IteratorMode::From(&prefix[..], Direction::Forward)) {
        let (key, value) = item?;
        if !key.starts_with(&prefix) {
            break;
        }
        rows.push(decode(&value)?);
    }

    Ok(rows)
}

#[async_trait]
impl LoanStore for RocksDBStore {
    async fn begin(&self, scope: LockScope) -> Result<Box<dyn LoanTransaction>> {
        let guard = match scope {
            LockScope::Loan(loan_id) => Some(self.locks.acquire(loan_id).await?),
            LockScope::NewLoan => None,
        };

        Ok(Box::new(RocksDBTransaction {
            db: Arc::clone(&self.db),
            sequences: Arc::clone(&self.sequences),
            staged: Tables::default(),
            guard,
            finished: false,
        }))
    }

    async fn get_loan(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        read_loan(&self.db, loan_id)
    }

    async fn installments(&self, loan_id: LoanId) -> Result<Vec<ScheduledInstallment>> {
        read_children(&self.db, CF_INSTALLMENTS, loan_id)
    }

    async fn payments(&self, loan_id: LoanId) -> Result<Vec<ReceivedPayment>> {
        read_children(&self.db, CF_PAYMENTS, loan_id)
    }

    async fn all_loans(&self) -> Result<Vec<Loan>> {
        let cf = column(&self.db, CF_LOANS)?;
        let mut loans = Vec::new();

        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            loans.push(decode(&value)?);
        }

        Ok(loans)
    }
}

pub struct RocksDBTransaction {
    db: Arc<DB>,
    sequences: Arc<Sequences>,
    staged: Tables,
    guard: Option<LoanLockGuard>,
    finished: bool,
}

impl RocksDBTransaction {
    fn ensure_active(&self) -> Result<()> {
        if self.finished {
            Err(LoanError::TransactionError(
                "Transaction already finished".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.guard = None;
    }

    /// Storage faults abort the unit of work they happen in.
    fn aborted(err: LoanError) -> LoanError {
        match err {
            LoanError::RocksDBError(e) => {
                LoanError::TransactionError(format!("Storage failure: {}", e))
            }
            LoanError::InternalError(e) => {
                LoanError::TransactionError(format!("Storage failure: {}", e))
            }
            other => other,
        }
    }

    fn write_batch(&self) -> Result<WriteBatch> {
        let loans = column(&self.db, CF_LOANS)?;
        let installments = column(&self.db, CF_INSTALLMENTS)?;
        let payments = column(&self.db, CF_PAYMENTS)?;

        let mut batch = WriteBatch::default();
        for loan in self.staged.loans.values() {
            batch.put_cf(loans, loan.id.to_be_bytes(), encode(loan)?);
        }
        for inst in self.staged.installments.values() {
            batch.put_cf(installments, child_key(inst.loan_id, inst.id), encode(inst)?);
        }
        for payment in self.staged.payments.values() {
            batch.put_cf(payments, child_key(payment.loan_id, payment.id), encode(payment)?);
        }
        Ok(batch)
    }
}

#[async_trait]
impl LoanTransaction for RocksDBTransaction {
    async fn create_loan(&mut self, draft: LoanDraft) -> Result<Loan> {
        self.ensure_active()?;
        let loan = Loan::disburse(self.sequences.next_loan(), draft);
        self.staged.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn create_installment(
        &mut self,
        loan: &Loan,
        entry: ScheduleEntry,
    ) -> Result<ScheduledInstallment> {
        self.ensure_active()?;
        let installment = ScheduledInstallment::new(
            self.sequences.next_installment(),
            loan.id,
            entry.amount,
            loan.currency,
            entry.due_date,
        );
        self.staged
            .installments
            .insert(installment.id, installment.clone());
        Ok(installment)
    }

    async fn find_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        self.ensure_active()?;
        match self.staged.loans.get(&loan_id) {
            Some(loan) => Ok(Some(loan.clone())),
            None => read_loan(&self.db, loan_id).map_err(Self::aborted),
        }
    }

    async fn installments(&mut self, loan_id: LoanId) -> Result<Vec<ScheduledInstallment>> {
        self.ensure_active()?;
        let base =
            read_children(&self.db, CF_INSTALLMENTS, loan_id).map_err(Self::aborted)?;
        Ok(self.staged.overlay_installments(loan_id, base))
    }

    async fn save_installment(&mut self, installment: ScheduledInstallment) -> Result<()> {
        self.ensure_active()?;
        self.staged.installments.insert(installment.id, installment);
        Ok(())
    }

    async fn save_loan(&mut self, loan: Loan) -> Result<()> {
        self.ensure_active()?;
        self.staged.loans.insert(loan.id, loan);
        Ok(())
    }

    async fn create_received_payment(
        &mut self,
        loan_id: LoanId,
        amount: Amount,
        currency: Currency,
        received_at: NaiveDate,
    ) -> Result<ReceivedPayment> {
        self.ensure_active()?;
        let payment = ReceivedPayment {
            id: self.sequences.next_payment(),
            loan_id,
            amount,
            currency,
            received_at,
        };
        self.staged.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;
        if !self.staged.is_empty() {
            let batch = self.write_batch().map_err(Self::aborted)?;
            self.db.write(batch).map_err(|e| {
                LoanError::TransactionError(format!("Failed to commit write batch: {}", e))
            })?;
        }
        self.staged = Tables::default();
        self.finish();
        Ok(())
    }

    async fn rollback(&mut self) {
        self.staged = Tables::default();
        self.finish();
    }
}
