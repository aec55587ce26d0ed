//! Payroll records and their `pending → processed → paid` lifecycle.

use super::actor::Actor;
use super::audit::{AuditEvent, AuditKind, AuditModule};
use super::employee::EmployeeId;
use super::money::Money;
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A payroll month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        let period = Self { year, month };
        period.validate()?;
        Ok(period)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=12).contains(&self.month) {
            return Err(EngineError::InvalidPayrollComputation(format!(
                "month {} is outside 1-12",
                self.month
            )));
        }
        if !(2000..=9999).contains(&self.year) {
            return Err(EngineError::InvalidPayrollComputation(format!(
                "year {} is outside 2000-9999",
                self.year
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PayrollStatus {
    Pending,
    Processed,
    Paid,
}

impl PayrollStatus {
    /// Forward-only: `pending → processed → paid`.
    pub fn can_transition_to(&self, next: PayrollStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processed) | (Self::Processed, Self::Paid)
        )
    }
}

impl fmt::Display for PayrollStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Paid => "paid",
        };
        f.write_str(s)
    }
}

/// A manual correction to a pending record.
#[derive(Debug, Clone, PartialEq)]
pub enum PayrollAmendment {
    BasicSalary(Money),
    SetAllowance { name: String, amount: Money },
    RemoveAllowance(String),
    SetDeduction { name: String, amount: Money },
    RemoveDeduction(String),
}

/// One employee's pay for one period.
///
/// Figures are only ever set by the calculator or by [`PayrollRecord::amend`]
/// while the record is pending. After `finalize` they are frozen.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PayrollRecord {
    id: String,
    employee: EmployeeId,
    #[serde(flatten)]
    period: Period,
    basic_salary: Money,
    allowances: BTreeMap<String, Money>,
    deductions: BTreeMap<String, Money>,
    gross_salary: Money,
    total_deductions: Money,
    net_salary: Money,
    status: PayrollStatus,
    processed_at: Option<DateTime<Utc>>,
    payment_date: Option<DateTime<Utc>>,
}

impl PayrollRecord {
    /// The id of the single record kept for `employee` in `period`.
    pub fn record_id(employee: &EmployeeId, period: Period) -> String {
        format!("{}/{:04}/{:02}", employee, period.year, period.month)
    }

    /// Builds a pending record, deriving the totals from the line items.
    pub(crate) fn pending(
        employee: EmployeeId,
        period: Period,
        basic_salary: Money,
        allowances: BTreeMap<String, Money>,
        deductions: BTreeMap<String, Money>,
    ) -> Result<Self> {
        let mut record = Self {
            id: Self::record_id(&employee, period),
            employee,
            period,
            basic_salary,
            allowances,
            deductions,
            gross_salary: Money::ZERO,
            total_deductions: Money::ZERO,
            net_salary: Money::ZERO,
            status: PayrollStatus::Pending,
            processed_at: None,
            payment_date: None,
        };
        record.recalculate_totals()?;
        Ok(record)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn employee(&self) -> &EmployeeId {
        &self.employee
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn basic_salary(&self) -> Money {
        self.basic_salary
    }

    pub fn allowances(&self) -> &BTreeMap<String, Money> {
        &self.allowances
    }

    pub fn deductions(&self) -> &BTreeMap<String, Money> {
        &self.deductions
    }

    pub fn gross_salary(&self) -> Money {
        self.gross_salary
    }

    pub fn total_deductions(&self) -> Money {
        self.total_deductions
    }

    pub fn net_salary(&self) -> Money {
        self.net_salary
    }

    pub fn status(&self) -> PayrollStatus {
        self.status
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn payment_date(&self) -> Option<DateTime<Utc>> {
        self.payment_date
    }

    pub fn is_locked(&self) -> bool {
        self.status != PayrollStatus::Pending
    }

    pub(crate) fn ensure_editable(&self) -> Result<()> {
        if self.is_locked() {
            return Err(EngineError::PayrollLocked {
                record_id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// gross = basic + allowances, net = gross - deductions; net must not go negative.
    fn recalculate_totals(&mut self) -> Result<()> {
        let overflow = |what: &str| {
            EngineError::InvalidPayrollComputation(format!("{what} of {} overflows", self.id))
        };
        let gross = Money::checked_sum(self.allowances.values())
            .and_then(|allowances| self.basic_salary.checked_add(allowances))
            .ok_or_else(|| overflow("gross salary"))?;
        let total_deductions =
            Money::checked_sum(self.deductions.values()).ok_or_else(|| overflow("deductions"))?;
        let net = gross
            .checked_sub(total_deductions)
            .ok_or_else(|| overflow("net salary"))?;
        if net.is_negative() {
            return Err(EngineError::InvalidPayrollComputation(format!(
                "deductions {total_deductions} exceed gross salary {gross} for {}",
                self.id
            )));
        }
        self.gross_salary = gross;
        self.total_deductions = total_deductions;
        self.net_salary = net;
        Ok(())
    }

    /// Applies a correction to a pending record and recomputes its totals.
    ///
    /// The record is left untouched if the amendment fails.
    pub fn amend(
        &mut self,
        amendment: PayrollAmendment,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<AuditEvent> {
        self.ensure_editable()?;

        let mut next = self.clone();
        let details = match amendment {
            PayrollAmendment::BasicSalary(amount) => {
                if !amount.is_positive() {
                    return Err(EngineError::InvalidPayrollComputation(format!(
                        "basic salary must be positive, got {amount}"
                    )));
                }
                next.basic_salary = amount;
                format!("basic salary set to {amount}")
            }
            PayrollAmendment::SetAllowance { name, amount } => {
                ensure_line_amount(&name, amount)?;
                let details = format!("allowance {name} set to {amount}");
                next.allowances.insert(name, amount);
                details
            }
            PayrollAmendment::RemoveAllowance(name) => {
                next.allowances.remove(&name);
                format!("allowance {name} removed")
            }
            PayrollAmendment::SetDeduction { name, amount } => {
                ensure_line_amount(&name, amount)?;
                let details = format!("deduction {name} set to {amount}");
                next.deductions.insert(name, amount);
                details
            }
            PayrollAmendment::RemoveDeduction(name) => {
                next.deductions.remove(&name);
                format!("deduction {name} removed")
            }
        };
        next.recalculate_totals()?;
        *self = next;

        Ok(AuditEvent::new(
            AuditModule::Payroll,
            AuditKind::Update,
            "Payroll amended",
            actor,
            &self.id,
            at,
        )
        .with_transition(self.status, self.status)
        .with_details(details))
    }

    /// `pending → processed`. Freezes all figures.
    pub fn finalize(&mut self, actor: &Actor, at: DateTime<Utc>) -> Result<AuditEvent> {
        self.ensure_editable()?;
        let from = self.status;
        self.status = PayrollStatus::Processed;
        self.processed_at = Some(at);

        Ok(AuditEvent::new(
            AuditModule::Payroll,
            AuditKind::Process,
            "Payroll processed",
            actor,
            &self.id,
            at,
        )
        .with_transition(from, self.status)
        .with_details(format!("net salary {}", self.net_salary)))
    }

    /// `processed → paid`. The payment date defaults to the transition time.
    pub fn mark_paid(
        &mut self,
        actor: &Actor,
        payment_date: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> Result<AuditEvent> {
        match self.status {
            PayrollStatus::Processed => {}
            PayrollStatus::Pending => {
                return Err(EngineError::InvalidPayrollTransition {
                    record_id: self.id.clone(),
                    from: self.status,
                    to: PayrollStatus::Paid,
                });
            }
            PayrollStatus::Paid => {
                return Err(EngineError::PayrollLocked {
                    record_id: self.id.clone(),
                    status: self.status,
                });
            }
        }
        let from = self.status;
        let paid_on = payment_date.unwrap_or(at);
        self.status = PayrollStatus::Paid;
        self.payment_date = Some(paid_on);

        Ok(AuditEvent::new(
            AuditModule::Payroll,
            AuditKind::Process,
            "Payroll paid",
            actor,
            &self.id,
            at,
        )
        .with_transition(from, self.status)
        .with_details(format!("paid {} on {}", self.net_salary, paid_on.date_naive())))
    }

    pub fn created_event(&self, actor: &Actor, at: DateTime<Utc>) -> AuditEvent {
        AuditEvent::new(
            AuditModule::Payroll,
            AuditKind::Create,
            "Payroll generated",
            actor,
            &self.id,
            at,
        )
        .with_initial_status(self.status)
        .with_details(self.summary())
    }

    pub fn recomputed_event(&self, actor: &Actor, at: DateTime<Utc>) -> AuditEvent {
        AuditEvent::new(
            AuditModule::Payroll,
            AuditKind::Update,
            "Payroll recalculated",
            actor,
            &self.id,
            at,
        )
        .with_transition(self.status, self.status)
        .with_details(self.summary())
    }

    fn summary(&self) -> String {
        format!(
            "{} {}: gross {}, deductions {}, net {}",
            self.employee, self.period, self.gross_salary, self.total_deductions, self.net_salary
        )
    }

    /// Guard for store adapters: can `stored` be replaced by `next`?
    ///
    /// Pending records may change freely. Locked records may only advance
    /// their status through a legal transition, with every figure unchanged.
    pub fn check_update(stored: &Self, next: &Self) -> Result<()> {
        if stored.id != next.id {
            return Err(EngineError::RecordNotFound(next.id.clone()));
        }
        if next.status != stored.status && !stored.status.can_transition_to(next.status) {
            return Err(EngineError::InvalidPayrollTransition {
                record_id: stored.id.clone(),
                from: stored.status,
                to: next.status,
            });
        }
        if !stored.is_locked() {
            return Ok(());
        }
        let figures_unchanged = stored.employee == next.employee
            && stored.period == next.period
            && stored.basic_salary == next.basic_salary
            && stored.allowances == next.allowances
            && stored.deductions == next.deductions
            && stored.gross_salary == next.gross_salary
            && stored.total_deductions == next.total_deductions
            && stored.net_salary == next.net_salary
            && stored.processed_at == next.processed_at;
        let payment_unchanged =
            stored.status != PayrollStatus::Paid || stored.payment_date == next.payment_date;
        if figures_unchanged && payment_unchanged {
            Ok(())
        } else {
            Err(EngineError::PayrollLocked {
                record_id: stored.id.clone(),
                status: stored.status,
            })
        }
    }
}

fn ensure_line_amount(name: &str, amount: Money) -> Result<()> {
    if name.trim().is_empty() {
        return Err(EngineError::InvalidPayrollComputation(
            "line item name must not be empty".to_string(),
        ));
    }
    if amount.is_negative() {
        return Err(EngineError::InvalidPayrollComputation(format!(
            "line item {name} has a negative amount {amount}"
        )));
    }
    Ok(())
}
