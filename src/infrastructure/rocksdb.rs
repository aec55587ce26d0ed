use crate::domain::audit::AuditEvent;
use crate::domain::component::SalaryComponentSet;
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::loan::{LoanId, LoanRecord};
use crate::domain::payroll::{PayrollRecord, Period};
use crate::domain::ports::{AuditSink, ComponentSetStore, EmployeeDirectory, LoanStore, PayrollStore};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Column Family for employee master data.
pub const CF_EMPLOYEES: &str = "employees";
/// Column Family holding the configured component set under a single key.
pub const CF_COMPONENTS: &str = "components";
/// Column Family for payroll records, keyed by `employee/yyyy/mm`.
pub const CF_PAYROLL: &str = "payroll";
/// Column Family for loan records, keyed by loan id.
pub const CF_LOANS: &str = "loans";
/// Column Family for the audit trail, keyed by timestamp.
pub const CF_AUDIT: &str = "audit";

const COMPONENT_SET_KEY: &[u8] = b"active";

/// A persistent store implementation using RocksDB.
///
/// Implements every storage port on one database, with a Column Family per
/// record type. Values are stored as JSON.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating any
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_EMPLOYEES, CF_COMPONENTS, CF_PAYROLL, CF_LOANS, CF_AUDIT]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Inserts or replaces an employee in the directory.
    pub fn put_employee(&self, employee: &Employee) -> Result<()> {
        self.put(CF_EMPLOYEES, employee.id.as_str().as_bytes(), employee)
    }

    /// Returns the audit trail in timestamp order.
    pub fn audit_events(&self) -> Result<Vec<AuditEvent>> {
        self.scan(CF_AUDIT)
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            EngineError::Storage(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn put<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn fetch<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn exists(&self, cf_name: &str, key: &[u8]) -> Result<bool> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, key)?.is_some())
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }
}

#[async_trait]
impl EmployeeDirectory for RocksDBStore {
    async fn resolve(&self, id: &EmployeeId) -> Result<Employee> {
        self.fetch(CF_EMPLOYEES, id.as_str().as_bytes())?
            .ok_or_else(|| EngineError::UnknownEmployee(id.clone()))
    }

    async fn all(&self) -> Result<Vec<Employee>> {
        self.scan(CF_EMPLOYEES)
    }
}

#[async_trait]
impl ComponentSetStore for RocksDBStore {
    async fn load(&self) -> Result<Option<SalaryComponentSet>> {
        self.fetch(CF_COMPONENTS, COMPONENT_SET_KEY)
    }

    async fn save(&self, set: SalaryComponentSet) -> Result<()> {
        self.put(CF_COMPONENTS, COMPONENT_SET_KEY, &set)
    }
}

#[async_trait]
impl PayrollStore for RocksDBStore {
    async fn get(&self, record_id: &str) -> Result<Option<PayrollRecord>> {
        self.fetch(CF_PAYROLL, record_id.as_bytes())
    }

    async fn get_by_period(
        &self,
        employee: &EmployeeId,
        period: Period,
    ) -> Result<Option<PayrollRecord>> {
        self.fetch(
            CF_PAYROLL,
            PayrollRecord::record_id(employee, period).as_bytes(),
        )
    }

    async fn insert(&self, record: PayrollRecord) -> Result<()> {
        if self.exists(CF_PAYROLL, record.id().as_bytes())? {
            return Err(EngineError::DuplicateRecord(record.id().to_string()));
        }
        self.put(CF_PAYROLL, record.id().as_bytes(), &record)
    }

    async fn update(&self, record: PayrollRecord) -> Result<()> {
        let stored: PayrollRecord = self
            .fetch(CF_PAYROLL, record.id().as_bytes())?
            .ok_or_else(|| EngineError::RecordNotFound(record.id().to_string()))?;
        PayrollRecord::check_update(&stored, &record)?;
        self.put(CF_PAYROLL, record.id().as_bytes(), &record)
    }

    async fn list_by_period(&self, period: Period) -> Result<Vec<PayrollRecord>> {
        let records: Vec<PayrollRecord> = self.scan(CF_PAYROLL)?;
        Ok(records.into_iter().filter(|r| r.period() == period).collect())
    }
}

#[async_trait]
impl LoanStore for RocksDBStore {
    async fn get(&self, id: &LoanId) -> Result<Option<LoanRecord>> {
        self.fetch(CF_LOANS, id.as_str().as_bytes())
    }

    async fn insert(&self, loan: LoanRecord) -> Result<()> {
        if self.exists(CF_LOANS, loan.id().as_str().as_bytes())? {
            return Err(EngineError::DuplicateRecord(loan.id().to_string()));
        }
        self.put(CF_LOANS, loan.id().as_str().as_bytes(), &loan)
    }

    async fn update(&self, loan: LoanRecord) -> Result<()> {
        let stored: LoanRecord = self
            .fetch(CF_LOANS, loan.id().as_str().as_bytes())?
            .ok_or_else(|| EngineError::RecordNotFound(loan.id().to_string()))?;
        LoanRecord::check_update(&stored, &loan)?;
        self.put(CF_LOANS, loan.id().as_str().as_bytes(), &loan)
    }

    async fn list_by_employee(&self, employee: &EmployeeId) -> Result<Vec<LoanRecord>> {
        let loans: Vec<LoanRecord> = self.scan(CF_LOANS)?;
        let mut matching: Vec<LoanRecord> = loans
            .into_iter()
            .filter(|l| l.employee() == employee)
            .collect();
        matching.sort_by_key(|l| l.requested_at());
        Ok(matching)
    }
}

#[async_trait]
impl AuditSink for RocksDBStore {
    async fn record(&self, event: AuditEvent) -> Result<()> {
        // Timestamp first so iteration follows event order; the uuid keeps
        // events from the same instant apart.
        let key = format!(
            "{}/{}",
            event.timestamp.format("%Y%m%dT%H%M%S%.9f"),
            Uuid::new_v4().simple()
        );
        self.put(CF_AUDIT, key.as_bytes(), &event)
    }
}
