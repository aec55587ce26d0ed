//! Application layer orchestrating the payroll and loan workflows.
//!
//! [`engine::PayrollEngine`] owns the storage ports. Each command loads a
//! record, applies a domain transition, stores the result and then publishes
//! the audit events the transition produced.

pub mod engine;
pub mod loans;
pub mod payroll;
