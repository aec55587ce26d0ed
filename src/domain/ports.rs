use super::audit::AuditEvent;
use super::component::SalaryComponentSet;
use super::employee::{Employee, EmployeeId};
use super::loan::{LoanId, LoanRecord};
use super::payroll::{PayrollRecord, Period};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read access to the employee master data.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Resolves a reference to the employee it names, or `UnknownEmployee`.
    async fn resolve(&self, id: &EmployeeId) -> Result<Employee>;
    async fn all(&self) -> Result<Vec<Employee>>;
}

#[async_trait]
pub trait ComponentSetStore: Send + Sync {
    async fn load(&self) -> Result<Option<SalaryComponentSet>>;
    async fn save(&self, set: SalaryComponentSet) -> Result<()>;
}

/// Payroll record persistence.
///
/// Implementations must keep at most one record per employee and period and
/// must run [`PayrollRecord::check_update`] before replacing a record.
#[async_trait]
pub trait PayrollStore: Send + Sync {
    async fn get(&self, record_id: &str) -> Result<Option<PayrollRecord>>;
    async fn get_by_period(
        &self,
        employee: &EmployeeId,
        period: Period,
    ) -> Result<Option<PayrollRecord>>;
    /// Fails with `DuplicateRecord` if the period already has a record.
    async fn insert(&self, record: PayrollRecord) -> Result<()>;
    /// Fails with `RecordNotFound` if there is nothing to update.
    async fn update(&self, record: PayrollRecord) -> Result<()>;
    async fn list_by_period(&self, period: Period) -> Result<Vec<PayrollRecord>>;
}

#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn get(&self, id: &LoanId) -> Result<Option<LoanRecord>>;
    async fn insert(&self, loan: LoanRecord) -> Result<()>;
    /// Runs [`LoanRecord::check_update`] against the stored version.
    async fn update(&self, loan: LoanRecord) -> Result<()>;
    async fn list_by_employee(&self, employee: &EmployeeId) -> Result<Vec<LoanRecord>>;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type EmployeeDirectoryBox = Box<dyn EmployeeDirectory>;
pub type ComponentSetStoreBox = Box<dyn ComponentSetStore>;
pub type PayrollStoreBox = Box<dyn PayrollStore>;
pub type LoanStoreBox = Box<dyn LoanStore>;
pub type AuditSinkBox = Box<dyn AuditSink>;
pub type ClockBox = Box<dyn Clock>;

pub type PayrollStoreFactory = Box<dyn Fn() -> PayrollStoreBox + Send + Sync>;
