use payroll_engine::application::engine::PayrollEngine;
use payroll_engine::domain::employee::{Employee, EmployeeStatus};
use payroll_engine::domain::money::Money;
use payroll_engine::infrastructure::in_memory::{
    InMemoryAuditLog, InMemoryComponentSetStore, InMemoryEmployeeDirectory, InMemoryLoanStore,
    InMemoryPayrollStore,
};
use rand::Rng;
use std::fs::File;
use std::io::Error;
use std::path::Path;

pub struct TestEngine {
    pub engine: PayrollEngine,
    pub directory: InMemoryEmployeeDirectory,
    pub audit: InMemoryAuditLog,
}

pub fn in_memory_engine(employees: Vec<Employee>) -> TestEngine {
    let directory = InMemoryEmployeeDirectory::with_employees(employees);
    let audit = InMemoryAuditLog::new();
    let engine = PayrollEngine::new(
        Box::new(directory.clone()),
        Box::new(InMemoryComponentSetStore::new()),
        Box::new(InMemoryPayrollStore::new()),
        Box::new(InMemoryLoanStore::new()),
        Box::new(audit.clone()),
    );
    TestEngine {
        engine,
        directory,
        audit,
    }
}

pub fn active_employee(id: &str, base: i64) -> Employee {
    Employee::new(id, Money::from_units(base), EmployeeStatus::Active)
}

pub fn write_employees_csv(path: &Path, rows: &[(&str, &str, &str)]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["id", "base_salary", "status"])?;
    for (id, base, status) in rows {
        wtr.write_record([id, base, status])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes `count` employees with random salaries between 10,000 and 200,000.
pub fn generate_employees_csv(path: &Path, count: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    let mut rng = rand::thread_rng();

    wtr.write_record(["id", "base_salary", "status"])?;
    for i in 1..=count {
        let base: u32 = rng.gen_range(10_000..=200_000);
        wtr.write_record([format!("E{i:04}"), base.to_string(), "active".to_string()])?;
    }

    wtr.flush()?;
    Ok(())
}
