use crate::domain::audit::AuditEvent;
use crate::domain::component::SalaryComponentSet;
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::loan::{LoanId, LoanRecord};
use crate::domain::payroll::{PayrollRecord, Period};
use crate::domain::ports::{AuditSink, ComponentSetStore, EmployeeDirectory, LoanStore, PayrollStore};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory employee directory.
///
/// Uses `Arc<RwLock<HashMap<EmployeeId, Employee>>>` so clones share the same
/// data. The command-line tool fills it from an employee CSV file.
#[derive(Default, Clone)]
pub struct InMemoryEmployeeDirectory {
    employees: Arc<RwLock<HashMap<EmployeeId, Employee>>>,
}

impl InMemoryEmployeeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employees(employees: impl IntoIterator<Item = Employee>) -> Self {
        let map = employees.into_iter().map(|e| (e.id.clone(), e)).collect();
        Self {
            employees: Arc::new(RwLock::new(map)),
        }
    }

    /// Inserts or replaces an employee.
    pub async fn upsert(&self, employee: Employee) {
        let mut employees = self.employees.write().await;
        employees.insert(employee.id.clone(), employee);
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryEmployeeDirectory {
    async fn resolve(&self, id: &EmployeeId) -> Result<Employee> {
        let employees = self.employees.read().await;
        employees
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownEmployee(id.clone()))
    }

    async fn all(&self) -> Result<Vec<Employee>> {
        let employees = self.employees.read().await;
        let mut all: Vec<Employee> = employees.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryComponentSetStore {
    set: Arc<RwLock<Option<SalaryComponentSet>>>,
}

impl InMemoryComponentSetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ComponentSetStore for InMemoryComponentSetStore {
    async fn load(&self) -> Result<Option<SalaryComponentSet>> {
        Ok(self.set.read().await.clone())
    }

    async fn save(&self, set: SalaryComponentSet) -> Result<()> {
        *self.set.write().await = Some(set);
        Ok(())
    }
}

/// A thread-safe in-memory store for payroll records, keyed by record id.
///
/// Record ids are derived from employee and period, so the id key alone
/// enforces one record per period.
#[derive(Default, Clone)]
pub struct InMemoryPayrollStore {
    records: Arc<RwLock<HashMap<String, PayrollRecord>>>,
}

impl InMemoryPayrollStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PayrollStore for InMemoryPayrollStore {
    async fn get(&self, record_id: &str) -> Result<Option<PayrollRecord>> {
        let records = self.records.read().await;
        Ok(records.get(record_id).cloned())
    }

    async fn get_by_period(
        &self,
        employee: &EmployeeId,
        period: Period,
    ) -> Result<Option<PayrollRecord>> {
        self.get(&PayrollRecord::record_id(employee, period)).await
    }

    async fn insert(&self, record: PayrollRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(record.id()) {
            return Err(EngineError::DuplicateRecord(record.id().to_string()));
        }
        records.insert(record.id().to_string(), record);
        Ok(())
    }

    async fn update(&self, record: PayrollRecord) -> Result<()> {
        let mut records = self.records.write().await;
        let stored = records
            .get(record.id())
            .ok_or_else(|| EngineError::RecordNotFound(record.id().to_string()))?;
        PayrollRecord::check_update(stored, &record)?;
        records.insert(record.id().to_string(), record);
        Ok(())
    }

    async fn list_by_period(&self, period: Period) -> Result<Vec<PayrollRecord>> {
        let records = self.records.read().await;
        let mut matching: Vec<PayrollRecord> = records
            .values()
            .filter(|r| r.period() == period)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.employee().cmp(b.employee()));
        Ok(matching)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryLoanStore {
    loans: Arc<RwLock<HashMap<LoanId, LoanRecord>>>,
}

impl InMemoryLoanStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanStore for InMemoryLoanStore {
    async fn get(&self, id: &LoanId) -> Result<Option<LoanRecord>> {
        let loans = self.loans.read().await;
        Ok(loans.get(id).cloned())
    }

    async fn insert(&self, loan: LoanRecord) -> Result<()> {
        let mut loans = self.loans.write().await;
        if loans.contains_key(loan.id()) {
            return Err(EngineError::DuplicateRecord(loan.id().to_string()));
        }
        loans.insert(loan.id().clone(), loan);
        Ok(())
    }

    async fn update(&self, loan: LoanRecord) -> Result<()> {
        let mut loans = self.loans.write().await;
        let stored = loans
            .get(loan.id())
            .ok_or_else(|| EngineError::RecordNotFound(loan.id().to_string()))?;
        LoanRecord::check_update(stored, &loan)?;
        loans.insert(loan.id().clone(), loan);
        Ok(())
    }

    async fn list_by_employee(&self, employee: &EmployeeId) -> Result<Vec<LoanRecord>> {
        let loans = self.loans.read().await;
        let mut matching: Vec<LoanRecord> = loans
            .values()
            .filter(|l| l.employee() == employee)
            .cloned()
            .collect();
        matching.sort_by_key(|l| l.requested_at());
        Ok(matching)
    }
}

/// Keeps every audit event in memory, in arrival order.
#[derive(Default, Clone)]
pub struct InMemoryAuditLog {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn record(&self, event: AuditEvent) -> Result<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::Actor;
    use crate::domain::amortization::LoanTerms;
    use crate::domain::calculator::PayrollCalculator;
    use crate::domain::employee::EmployeeStatus;
    use crate::domain::loan::LoanType;
    use crate::domain::money::Money;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn employee(id: &str) -> Employee {
        Employee::new(id, Money::from_units(50_000), EmployeeStatus::Active)
    }

    fn record_for(id: &str) -> PayrollRecord {
        PayrollCalculator::new()
            .compute_for_period(
                &employee(id),
                &SalaryComponentSet::statutory_default(),
                Period::new(2024, 3).unwrap(),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_employee_directory() {
        let directory = InMemoryEmployeeDirectory::with_employees([employee("E2"), employee("E1")]);

        let resolved = directory.resolve(&EmployeeId::new("E1")).await.unwrap();
        assert_eq!(resolved, employee("E1"));

        let missing = directory.resolve(&EmployeeId::new("E9")).await;
        assert!(matches!(missing, Err(EngineError::UnknownEmployee(_))));

        let all = directory.all().await.unwrap();
        assert_eq!(all[0].id, EmployeeId::new("E1"));
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_in_memory_payroll_store_single_record_per_period() {
        let store = InMemoryPayrollStore::new();
        let record = record_for("E1");

        store.insert(record.clone()).await.unwrap();
        let duplicate = store.insert(record.clone()).await;
        assert!(matches!(duplicate, Err(EngineError::DuplicateRecord(_))));

        let retrieved = store
            .get_by_period(&EmployeeId::new("E1"), Period::new(2024, 3).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(retrieved, record);
    }

    #[tokio::test]
    async fn test_in_memory_payroll_store_update_is_guarded() {
        let store = InMemoryPayrollStore::new();
        let record = record_for("E1");
        store.insert(record.clone()).await.unwrap();

        let mut processed = record.clone();
        processed.finalize(&Actor::system(), Utc::now()).unwrap();
        store.update(processed).await.unwrap();

        // A stale pending copy cannot overwrite the processed record.
        let result = store.update(record).await;
        assert!(matches!(
            result,
            Err(EngineError::InvalidPayrollTransition { .. })
        ));

        let missing = store.update(record_for("E2")).await;
        assert!(matches!(missing, Err(EngineError::RecordNotFound(_))));
    }

    #[tokio::test]
    async fn test_in_memory_payroll_store_list_by_period() {
        let store = InMemoryPayrollStore::new();
        store.insert(record_for("E2")).await.unwrap();
        store.insert(record_for("E1")).await.unwrap();

        let march = store
            .list_by_period(Period::new(2024, 3).unwrap())
            .await
            .unwrap();
        let ids: Vec<_> = march.iter().map(|r| r.employee().as_str()).collect();
        assert_eq!(ids, vec!["E1", "E2"]);

        let april = store
            .list_by_period(Period::new(2024, 4).unwrap())
            .await
            .unwrap();
        assert!(april.is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_loan_store() {
        let store = InMemoryLoanStore::new();
        let loan = LoanRecord::request(
            LoanId::new("LN-1"),
            EmployeeId::new("E1"),
            LoanType::Advance,
            LoanTerms::new(Money::from_units(10_000), dec!(0), 5).unwrap(),
            Utc::now(),
        );

        store.insert(loan.clone()).await.unwrap();
        assert!(store.insert(loan.clone()).await.is_err());
        assert_eq!(store.get(loan.id()).await.unwrap().unwrap(), loan);

        let loans = store
            .list_by_employee(&EmployeeId::new("E1"))
            .await
            .unwrap();
        assert_eq!(loans.len(), 1);
        assert!(
            store
                .list_by_employee(&EmployeeId::new("E2"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_in_memory_component_store_and_audit_log() {
        let store = InMemoryComponentSetStore::new();
        assert!(store.load().await.unwrap().is_none());
        store
            .save(SalaryComponentSet::statutory_default())
            .await
            .unwrap();
        assert_eq!(
            store.load().await.unwrap(),
            Some(SalaryComponentSet::statutory_default())
        );

        let log = InMemoryAuditLog::new();
        let event = record_for("E1").created_event(&Actor::system(), Utc::now());
        log.record(event.clone()).await.unwrap();
        assert_eq!(log.events().await, vec![event]);
    }
}
