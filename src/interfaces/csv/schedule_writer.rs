use crate::domain::amortization::AmortizationSchedule;
use crate::error::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct ScheduleRow {
    installment: u32,
    due_date: Option<NaiveDate>,
    emi: Decimal,
    interest: Decimal,
    principal: Decimal,
    balance: Decimal,
}

/// Writes an amortization schedule as CSV. The `due_date` column is empty
/// when the schedule has no start date.
pub struct ScheduleWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ScheduleWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_schedule(&mut self, schedule: &AmortizationSchedule) -> Result<()> {
        for entry in schedule.entries() {
            self.writer.serialize(ScheduleRow {
                installment: entry.installment,
                due_date: entry.due_date,
                emi: entry.emi.value().normalize(),
                interest: entry.interest.value().normalize(),
                principal: entry.principal.value().normalize(),
                balance: entry.balance.value().normalize(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::amortization::LoanAmortizer;
    use crate::domain::money::Money;
    use rust_decimal_macros::dec;

    fn write(schedule: &AmortizationSchedule) -> Vec<String> {
        let mut buffer = Vec::new();
        ScheduleWriter::new(&mut buffer)
            .write_schedule(schedule)
            .unwrap();
        String::from_utf8(buffer)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_write_interest_free_schedule() {
        let schedule =
            LoanAmortizer::compute_schedule(Money::from_units(50_000), dec!(0), 12).unwrap();
        let lines = write(&schedule);

        assert_eq!(lines[0], "installment,due_date,emi,interest,principal,balance");
        assert_eq!(lines[1], "1,,4167,0,4167,45833");
        assert_eq!(lines[12], "12,,4163,0,4163,0");
        assert_eq!(lines.len(), 13);
    }

    #[test]
    fn test_write_dated_schedule() {
        let schedule = LoanAmortizer::compute_schedule(Money::from_units(100_000), dec!(12), 12)
            .unwrap()
            .with_start_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        let lines = write(&schedule);

        assert_eq!(lines[1], "1,2024-02-15,8885,1000,7885,92115");
    }
}
