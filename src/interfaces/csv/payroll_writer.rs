use crate::domain::payroll::PayrollRecord;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct RegisterRow<'a> {
    employee: &'a str,
    month: u32,
    year: i32,
    basic: Decimal,
    gross: Decimal,
    deductions: Decimal,
    net: Decimal,
    status: String,
}

impl<'a> From<&'a PayrollRecord> for RegisterRow<'a> {
    fn from(record: &'a PayrollRecord) -> Self {
        Self {
            employee: record.employee().as_str(),
            month: record.period().month,
            year: record.period().year,
            basic: record.basic_salary().value().normalize(),
            gross: record.gross_salary().value().normalize(),
            deductions: record.total_deductions().value().normalize(),
            net: record.net_salary().value().normalize(),
            status: record.status().to_string(),
        }
    }
}

/// Writes a payroll register as CSV, one row per record.
pub struct PayrollRegisterWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PayrollRegisterWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_records<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a PayrollRecord>,
    ) -> Result<()> {
        for record in records {
            self.writer.serialize(RegisterRow::from(record))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
