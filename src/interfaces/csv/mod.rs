//! CSV input and output for the command-line tool.

pub mod component_reader;
pub mod employee_reader;
pub mod payroll_writer;
pub mod schedule_writer;
