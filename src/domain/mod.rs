//! Pure payroll and loan rules.
//!
//! Nothing in this module performs I/O. Collaborators are reached through
//! the traits in [`ports`].

pub mod actor;
pub mod amortization;
pub mod audit;
pub mod calculator;
pub mod component;
pub mod employee;
pub mod loan;
pub mod money;
pub mod payroll;
pub mod ports;
