use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use payroll_engine::application::engine::PayrollEngine;
use payroll_engine::application::payroll::PayrollRunOutcome;
use payroll_engine::config::EngineConfig;
use payroll_engine::domain::actor::Actor;
use payroll_engine::domain::amortization::LoanAmortizer;
use payroll_engine::domain::money::Money;
use payroll_engine::domain::payroll::Period;
use payroll_engine::domain::ports::{
    AuditSinkBox, ComponentSetStoreBox, LoanStoreBox, PayrollStoreBox,
};
use payroll_engine::infrastructure::in_memory::{
    InMemoryComponentSetStore, InMemoryEmployeeDirectory, InMemoryLoanStore,
    InMemoryPayrollStore,
};
use payroll_engine::infrastructure::tracing_sink::TracingAuditSink;
use payroll_engine::interfaces::csv::component_reader::ComponentReader;
use payroll_engine::interfaces::csv::employee_reader::EmployeeReader;
use payroll_engine::interfaces::csv::payroll_writer::PayrollRegisterWriter;
use payroll_engine::interfaces::csv::schedule_writer::ScheduleWriter;
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration JSON file (optional).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute the payroll register of one month
    Payroll {
        /// Employees CSV file (`id,base_salary,status`)
        #[arg(long)]
        employees: PathBuf,

        #[arg(long)]
        month: u32,

        #[arg(long)]
        year: i32,

        /// Salary components CSV file; defaults to the configured set
        #[arg(long)]
        components: Option<PathBuf>,

        /// Finalize every record computed by this run
        #[arg(long)]
        finalize: bool,
    },
    /// Print a loan amortization schedule
    Schedule {
        #[arg(long)]
        principal: Decimal,

        /// Annual interest rate in percent
        #[arg(long)]
        rate: Decimal,

        /// Tenure in months
        #[arg(long)]
        tenure: u32,

        /// Disbursement date; installments fall due monthly after it
        #[arg(long)]
        start: Option<NaiveDate>,
    },
}

struct Stores {
    components: ComponentSetStoreBox,
    payroll: PayrollStoreBox,
    loans: LoanStoreBox,
    audit: AuditSinkBox,
}

impl Stores {
    fn in_memory() -> Self {
        Self {
            components: Box::new(InMemoryComponentSetStore::new()),
            payroll: Box::new(InMemoryPayrollStore::new()),
            loans: Box::new(InMemoryLoanStore::new()),
            audit: Box::new(TracingAuditSink),
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    use payroll_engine::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok(Stores {
                components: Box::new(store.clone()),
                payroll: Box::new(store.clone()),
                loans: Box::new(store.clone()),
                audit: Box::new(store),
            })
        }
        None => Ok(Stores::in_memory()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(Stores::in_memory())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path).into_diagnostic()?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Payroll {
            employees,
            month,
            year,
            components,
            finalize,
        } => {
            let period = Period::new(year, month).into_diagnostic()?;
            let stores = open_stores(cli.db_path)?;
            run_payroll(config, stores, employees, components, period, finalize).await
        }
        Command::Schedule {
            principal,
            rate,
            tenure,
            start,
        } => print_schedule(principal, rate, tenure, start),
    }
}

async fn run_payroll(
    config: EngineConfig,
    stores: Stores,
    employees: PathBuf,
    components: Option<PathBuf>,
    period: Period,
    finalize: bool,
) -> Result<()> {
    let directory = InMemoryEmployeeDirectory::new();
    let file = File::open(employees).into_diagnostic()?;
    for employee in EmployeeReader::new(file).employees() {
        match employee {
            Ok(employee) => directory.upsert(employee).await,
            Err(e) => eprintln!("Error reading employee: {}", e),
        }
    }

    let component_set = match components {
        Some(path) => {
            let file = File::open(path).into_diagnostic()?;
            ComponentReader::new(file).read_set().into_diagnostic()?
        }
        None => config.component_set(),
    };

    let engine = PayrollEngine::new(
        Box::new(directory),
        stores.components,
        stores.payroll,
        stores.loans,
        stores.audit,
    )
    .with_loan_policy(config.loan_policy);

    let actor = Actor::system();
    engine
        .configure_components(component_set, &actor)
        .await
        .into_diagnostic()?;

    let outcomes = engine
        .run_payroll_for_period(period, &actor)
        .await
        .into_diagnostic()?;
    for outcome in &outcomes {
        match outcome {
            PayrollRunOutcome::Computed(record) if finalize => {
                if let Err(e) = engine.finalize_payroll(record.id(), &actor).await {
                    eprintln!("Error finalizing payroll {}: {}", record.id(), e);
                }
            }
            PayrollRunOutcome::Computed(_) => {}
            PayrollRunOutcome::Skipped { employee, status } => {
                eprintln!("Skipping employee {employee}: payroll for {period} is already {status}");
            }
            PayrollRunOutcome::Failed { employee, error } => {
                eprintln!("Error processing employee {employee}: {error}");
            }
        }
    }

    let register = engine.payroll_register(period).await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = PayrollRegisterWriter::new(stdout.lock());
    writer.write_records(&register).into_diagnostic()?;

    Ok(())
}

fn print_schedule(
    principal: Decimal,
    rate: Decimal,
    tenure: u32,
    start: Option<NaiveDate>,
) -> Result<()> {
    let mut schedule =
        LoanAmortizer::compute_schedule(Money::new(principal), rate, tenure).into_diagnostic()?;
    if let Some(start) = start {
        schedule = schedule.with_start_date(start);
    }

    let stdout = io::stdout();
    let mut writer = ScheduleWriter::new(stdout.lock());
    writer.write_schedule(&schedule).into_diagnostic()?;

    Ok(())
}
