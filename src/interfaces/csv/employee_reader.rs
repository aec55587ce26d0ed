use crate::domain::employee::{Employee, EmployeeStatus};
use crate::domain::money::Money;
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct EmployeeRow {
    id: String,
    base_salary: Decimal,
    status: Option<EmployeeStatus>,
}

/// Reads employee master data from a CSV source with an
/// `id,base_salary,status` header.
///
/// A blank status column means `active`.
pub struct EmployeeReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EmployeeReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and converts each row.
    pub fn employees(self) -> impl Iterator<Item = Result<Employee>> {
        self.reader.into_deserialize().map(|row| {
            let row: EmployeeRow = row.map_err(EngineError::from)?;
            Ok(Employee::new(
                row.id,
                Money::new(row.base_salary),
                row.status.unwrap_or(EmployeeStatus::Active),
            ))
        })
    }
}
