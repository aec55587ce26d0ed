use crate::domain::employee::EmployeeId;
use crate::domain::loan::LoanStatus;
use crate::domain::payroll::PayrollStatus;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Every failure the engine can report to its caller.
///
/// Domain variants carry enough context to be shown to an operator as-is;
/// `kind()` gives a stable identifier for callers that map errors onto their
/// own surface (HTTP status codes, UI messages).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid salary component configuration: {0}")]
    InvalidComponentConfiguration(String),

    #[error("invalid payroll computation: {0}")]
    InvalidPayrollComputation(String),

    #[error("payroll record {record_id} is locked (status: {status})")]
    PayrollLocked {
        record_id: String,
        status: PayrollStatus,
    },

    #[error("payroll record {record_id} cannot move from {from} to {to}")]
    InvalidPayrollTransition {
        record_id: String,
        from: PayrollStatus,
        to: PayrollStatus,
    },

    #[error("invalid loan parameters: {0}")]
    InvalidLoanParameters(String),

    #[error("invalid operation on loan {loan_id}: {reason}")]
    InvalidLoanOperation { loan_id: String, reason: String },

    #[error("loan {loan_id} has already been decided (status: {status})")]
    LoanAlreadyDecided { loan_id: String, status: LoanStatus },

    #[error("actor {actor} is not authorized to {action}")]
    UnauthorizedActor { actor: String, action: String },

    #[error("unknown employee {0}")]
    UnknownEmployee(EmployeeId),

    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("duplicate record: {0}")]
    DuplicateRecord(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Stable, machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidComponentConfiguration(_) => "InvalidComponentConfiguration",
            Self::InvalidPayrollComputation(_) => "InvalidPayrollComputation",
            Self::PayrollLocked { .. } => "PayrollLocked",
            Self::InvalidPayrollTransition { .. } => "InvalidPayrollTransition",
            Self::InvalidLoanParameters(_) => "InvalidLoanParameters",
            Self::InvalidLoanOperation { .. } => "InvalidLoanOperation",
            Self::LoanAlreadyDecided { .. } => "LoanAlreadyDecided",
            Self::UnauthorizedActor { .. } => "UnauthorizedActor",
            Self::UnknownEmployee(_) => "UnknownEmployee",
            Self::RecordNotFound(_) => "RecordNotFound",
            Self::DuplicateRecord(_) => "DuplicateRecord",
            Self::Config(_) => "Config",
            Self::Storage(_) => "Storage",
            Self::Csv(_) => "Csv",
            Self::Io(_) => "Io",
            Self::Serialization(_) => "Serialization",
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for EngineError {
    fn from(e: rocksdb::Error) -> Self {
        Self::Storage(Box::new(e))
    }
}
