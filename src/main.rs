use clap::Parser;
use loanbook::application::service::LoanService;
use loanbook::config::LedgerConfig;
use loanbook::domain::allocation::AllocationMode;
use loanbook::domain::ports::LoanStoreBox;
use loanbook::infrastructure::in_memory::InMemoryLoanStore;
#[cfg(feature = "storage-rocksdb")]
use loanbook::infrastructure::rocksdb::RocksDBStore;
use loanbook::interfaces::csv::command_reader::CommandReader;
use loanbook::interfaces::csv::loan_writer::LoanWriter;
use log::{error, warn};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JSON ledger configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Allocation rule: `literal` or `corrected`
    #[arg(long)]
    allocation: Option<AllocationMode>,

    /// Allowed term counts, comma separated
    #[arg(long, value_delimiter = ',')]
    terms: Option<Vec<u32>>,

    /// Also print every installment after the loans
    #[arg(long)]
    schedule: bool,
}

impl Cli {
    fn ledger_config(&self) -> Result<LedgerConfig> {
        let mut config = match &self.config {
            Some(path) => LedgerConfig::from_json_file(path).into_diagnostic()?,
            None => LedgerConfig::default(),
        };
        if let Some(mode) = self.allocation {
            config.allocation = mode;
        }
        if let Some(terms) = &self.terms {
            config.allowed_terms = terms.clone();
        }
        config.validate().into_diagnostic()?;
        Ok(config)
    }
}

fn open_store(db_path: Option<PathBuf>, config: &LedgerConfig) -> Result<LoanStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = RocksDBStore::open(path)
                .into_diagnostic()?
                .with_lock_timeout(config.lock_timeout());
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(
                InMemoryLoanStore::new().with_lock_timeout(config.lock_timeout()),
            ))
        }
        None => Ok(Box::new(
            InMemoryLoanStore::new().with_lock_timeout(config.lock_timeout()),
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = cli.ledger_config()?;
    let store = open_store(cli.db_path.clone(), &config)?;
    let service = LoanService::new(store, config);

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for (row, command) in reader.commands().enumerate() {
        match command {
            Ok(command) => {
                match command.apply(&service).await {
                    Ok(_) => {}
                    Err(e) if e.is_validation() => {
                        warn!("Rejected command on row {}: {}", row + 1, e);
                    }
                    Err(e) => error!("Error processing command on row {}: {}", row + 1, e),
                }
            }
            Err(e) => {
                error!("Error reading command on row {}: {}", row + 1, e);
            }
        }
    }

    let loans = service.loans().await.into_diagnostic()?;
    let mut installments = Vec::new();
    if cli.schedule {
        for loan in &loans {
            installments.extend(service.schedule(loan.id).await.into_diagnostic()?);
        }
    }

    let stdout = io::stdout();
    let mut writer = LoanWriter::new(stdout.lock());
    writer.write_loans(&loans).into_diagnostic()?;
    if cli.schedule {
        writer.write_installments(&installments).into_diagnostic()?;
    }

    Ok(())
}
