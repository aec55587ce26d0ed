//! Employee loans and advances.
//!
//! A loan moves through `pending → approved | rejected`, and an approved loan
//! through `active → completed`. Only the principal part of a repayment moves
//! between `paid_amount` and `remaining_amount`, so their sum always equals
//! the principal; interest is accumulated separately in `interest_paid`.

use super::actor::Actor;
use super::amortization::{AmortizationSchedule, LoanAmortizer, LoanTerms};
use super::audit::{AuditEvent, AuditKind, AuditModule};
use super::employee::{Employee, EmployeeId, EmployeeStatus};
use super::money::Money;
use crate::error::{EngineError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(String);

impl LoanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("LN-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LoanType {
    Personal,
    Advance,
    Emergency,
}

impl fmt::Display for LoanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Personal => "personal",
            Self::Advance => "advance",
            Self::Emergency => "emergency",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Active,
    Completed,
}

impl LoanStatus {
    pub fn can_transition_to(&self, next: LoanStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Active)
                | (Self::Active, Self::Completed)
        )
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Active => "active",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Eligibility rules checked when a loan is requested.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct LoanPolicy {
    /// Maximum principal as a multiple of the monthly base salary.
    pub personal_salary_multiple: Decimal,
    pub advance_salary_multiple: Decimal,
    pub emergency_salary_multiple: Decimal,
    pub eligible_statuses: Vec<EmployeeStatus>,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            personal_salary_multiple: dec!(10),
            advance_salary_multiple: dec!(1),
            emergency_salary_multiple: dec!(3),
            eligible_statuses: vec![EmployeeStatus::Active, EmployeeStatus::Probation],
        }
    }
}

impl LoanPolicy {
    pub fn max_principal(&self, employee: &Employee, loan_type: LoanType) -> Money {
        let multiple = match loan_type {
            LoanType::Personal => self.personal_salary_multiple,
            LoanType::Advance => self.advance_salary_multiple,
            LoanType::Emergency => self.emergency_salary_multiple,
        };
        Money::new(employee.base_salary.value() * multiple)
    }

    pub fn check_eligibility(
        &self,
        employee: &Employee,
        loan_type: LoanType,
        principal: Money,
    ) -> Result<()> {
        if !self.eligible_statuses.contains(&employee.status) {
            return Err(EngineError::InvalidLoanParameters(format!(
                "employee {} is {} and not eligible for loans",
                employee.id, employee.status
            )));
        }
        let limit = self.max_principal(employee, loan_type);
        if principal > limit {
            return Err(EngineError::InvalidLoanParameters(format!(
                "{loan_type} loan of {principal} exceeds the limit of {limit} for employee {}",
                employee.id
            )));
        }
        Ok(())
    }
}

/// The outcome of one repayment.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoanPayment {
    pub loan_id: LoanId,
    /// Schedule installment settled, `None` for ad-hoc prepayments.
    pub installment: Option<u32>,
    pub principal: Money,
    pub interest: Money,
    pub remaining_after: Money,
    pub completed: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    id: LoanId,
    employee: EmployeeId,
    loan_type: LoanType,
    #[serde(flatten)]
    terms: LoanTerms,
    emi_amount: Money,
    start_date: Option<NaiveDate>,
    status: LoanStatus,
    paid_amount: Money,
    interest_paid: Money,
    remaining_amount: Money,
    installments_paid: u32,
    schedule: Option<AmortizationSchedule>,
    approved_by: Option<String>,
    approved_date: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    requested_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl LoanRecord {
    /// Creates a pending loan. The EMI is derived from `terms` immediately so
    /// the request can be reviewed before approval.
    pub fn request(
        id: LoanId,
        employee: EmployeeId,
        loan_type: LoanType,
        terms: LoanTerms,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            employee,
            loan_type,
            emi_amount: LoanAmortizer::emi(&terms),
            terms,
            start_date: None,
            status: LoanStatus::Pending,
            paid_amount: Money::ZERO,
            interest_paid: Money::ZERO,
            remaining_amount: terms.principal(),
            installments_paid: 0,
            schedule: None,
            approved_by: None,
            approved_date: None,
            rejection_reason: None,
            requested_at,
            completed_at: None,
        }
    }

    pub fn id(&self) -> &LoanId {
        &self.id
    }

    pub fn employee(&self) -> &EmployeeId {
        &self.employee
    }

    pub fn loan_type(&self) -> LoanType {
        self.loan_type
    }

    pub fn terms(&self) -> &LoanTerms {
        &self.terms
    }

    pub fn principal(&self) -> Money {
        self.terms.principal()
    }

    pub fn emi_amount(&self) -> Money {
        self.emi_amount
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn status(&self) -> LoanStatus {
        self.status
    }

    pub fn paid_amount(&self) -> Money {
        self.paid_amount
    }

    pub fn interest_paid(&self) -> Money {
        self.interest_paid
    }

    pub fn remaining_amount(&self) -> Money {
        self.remaining_amount
    }

    pub fn installments_paid(&self) -> u32 {
        self.installments_paid
    }

    pub fn schedule(&self) -> Option<&AmortizationSchedule> {
        self.schedule.as_ref()
    }

    pub fn approved_by(&self) -> Option<&str> {
        self.approved_by.as_deref()
    }

    pub fn approved_date(&self) -> Option<DateTime<Utc>> {
        self.approved_date
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn requested_event(&self, actor: &Actor, at: DateTime<Utc>) -> AuditEvent {
        self.event(AuditKind::Create, "Loan requested", actor, at)
            .with_initial_status(self.status)
            .with_details(format!(
                "{} loan of {} over {} months at {}%, EMI {}",
                self.loan_type,
                self.principal(),
                self.terms.tenure_months(),
                self.terms.annual_rate_percent(),
                self.emi_amount
            ))
    }

    /// `pending → approved`.
    pub fn approve(&mut self, actor: &Actor, at: DateTime<Utc>) -> Result<AuditEvent> {
        self.authorize(actor, "approve loans")?;
        self.ensure_undecided()?;
        let from = self.status;
        self.status = LoanStatus::Approved;
        self.approved_by = Some(actor.id.clone());
        self.approved_date = Some(at);

        Ok(self
            .event(AuditKind::Approval, "Loan approved", actor, at)
            .with_transition(from, self.status))
    }

    /// `pending → rejected`. Terminal.
    pub fn reject(
        &mut self,
        actor: &Actor,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<AuditEvent> {
        self.authorize(actor, "reject loans")?;
        self.ensure_undecided()?;
        let from = self.status;
        self.status = LoanStatus::Rejected;
        let details = reason.clone().unwrap_or_default();
        self.rejection_reason = reason;

        Ok(self
            .event(AuditKind::Approval, "Loan rejected", actor, at)
            .with_transition(from, self.status)
            .with_details(details))
    }

    /// `approved → active`: attaches the repayment schedule starting at `start_date`.
    pub fn activate(
        &mut self,
        actor: &Actor,
        start_date: NaiveDate,
        at: DateTime<Utc>,
    ) -> Result<AuditEvent> {
        self.authorize(actor, "disburse loans")?;
        if self.status != LoanStatus::Approved {
            return Err(self.invalid_operation(format!(
                "only approved loans can be activated, loan is {}",
                self.status
            )));
        }
        let schedule = LoanAmortizer::schedule(&self.terms).with_start_date(start_date);
        let from = self.status;
        self.status = LoanStatus::Active;
        self.start_date = Some(start_date);
        self.emi_amount = schedule.emi_amount();
        self.paid_amount = Money::ZERO;
        self.interest_paid = Money::ZERO;
        self.remaining_amount = self.principal();
        self.installments_paid = 0;
        self.schedule = Some(schedule);

        Ok(self
            .event(AuditKind::Process, "Loan disbursed", actor, at)
            .with_transition(from, self.status)
            .with_details(format!("repayments start {start_date}")))
    }

    /// Deducts the next installment.
    ///
    /// Interest is charged on the remaining amount at deduction time and the
    /// principal part is capped at it, so a loan that was partly prepaid pays
    /// less interest and finishes on a smaller final EMI. Returns the audit
    /// events for the deduction and, if it settled the loan, the completion.
    pub fn apply_emi(
        &mut self,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<(LoanPayment, Vec<AuditEvent>)> {
        self.ensure_active()?;
        let installment = self.installments_paid + 1;
        let (interest, principal) = LoanAmortizer::split_installment(
            &self.terms,
            self.emi_amount,
            installment,
            self.remaining_amount,
        );

        self.installments_paid = installment;
        self.interest_paid += interest;
        self.apply_principal(principal, Some(installment), interest, actor, at)
    }

    /// Applies an ad-hoc principal prepayment.
    pub fn repay(
        &mut self,
        amount: Money,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<(LoanPayment, Vec<AuditEvent>)> {
        self.ensure_active()?;
        if !amount.is_positive() {
            return Err(self.invalid_operation(format!("payment must be positive, got {amount}")));
        }
        if amount > self.remaining_amount {
            return Err(self.invalid_operation(format!(
                "payment {amount} exceeds remaining amount {}",
                self.remaining_amount
            )));
        }
        self.apply_principal(amount, None, Money::ZERO, actor, at)
    }

    fn apply_principal(
        &mut self,
        principal: Money,
        installment: Option<u32>,
        interest: Money,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<(LoanPayment, Vec<AuditEvent>)> {
        self.paid_amount += principal;
        self.remaining_amount -= principal;

        let action = match installment {
            Some(_) => "EMI deducted",
            None => "Loan repayment",
        };
        let mut events = vec![
            self.event(AuditKind::Process, action, actor, at)
                .with_transition(self.status, self.status)
                .with_details(format!(
                    "principal {principal}, interest {interest}, remaining {}",
                    self.remaining_amount
                )),
        ];

        if self.remaining_amount.is_zero() {
            let from = self.status;
            self.status = LoanStatus::Completed;
            self.completed_at = Some(at);
            events.push(
                self.event(AuditKind::Update, "Loan completed", actor, at)
                    .with_transition(from, self.status),
            );
        }

        let payment = LoanPayment {
            loan_id: self.id.clone(),
            installment,
            principal,
            interest,
            remaining_after: self.remaining_amount,
            completed: self.status == LoanStatus::Completed,
        };
        Ok((payment, events))
    }

    fn authorize(&self, actor: &Actor, action: &str) -> Result<()> {
        if actor.can_decide_loans() {
            Ok(())
        } else {
            Err(EngineError::UnauthorizedActor {
                actor: actor.id.clone(),
                action: action.to_string(),
            })
        }
    }

    fn ensure_undecided(&self) -> Result<()> {
        if self.status == LoanStatus::Pending {
            Ok(())
        } else {
            Err(EngineError::LoanAlreadyDecided {
                loan_id: self.id.to_string(),
                status: self.status,
            })
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.status == LoanStatus::Active {
            Ok(())
        } else {
            Err(self.invalid_operation(format!(
                "payments require an active loan, loan is {}",
                self.status
            )))
        }
    }

    fn invalid_operation(&self, reason: String) -> EngineError {
        EngineError::InvalidLoanOperation {
            loan_id: self.id.to_string(),
            reason,
        }
    }

    fn event(&self, kind: AuditKind, action: &str, actor: &Actor, at: DateTime<Utc>) -> AuditEvent {
        AuditEvent::new(AuditModule::Loan, kind, action, actor, self.id.as_str(), at)
    }

    /// Guard for store adapters: can `stored` be replaced by `next`?
    ///
    /// Status may only move along a legal transition, the principal split
    /// must stay balanced, and the remaining amount never grows.
    pub fn check_update(stored: &Self, next: &Self) -> Result<()> {
        let reject = |reason: String| EngineError::InvalidLoanOperation {
            loan_id: stored.id.to_string(),
            reason,
        };
        if stored.id != next.id || stored.terms != next.terms || stored.employee != next.employee
        {
            return Err(reject("loan identity and terms cannot change".to_string()));
        }
        if next.status != stored.status && !stored.status.can_transition_to(next.status) {
            return Err(reject(format!(
                "cannot move from {} to {}",
                stored.status, next.status
            )));
        }
        if next.paid_amount + next.remaining_amount != next.principal() {
            return Err(reject(format!(
                "paid {} and remaining {} do not add up to principal {}",
                next.paid_amount,
                next.remaining_amount,
                next.principal()
            )));
        }
        if next.remaining_amount > stored.remaining_amount {
            return Err(reject(format!(
                "remaining amount cannot grow from {} to {}",
                stored.remaining_amount, next.remaining_amount
            )));
        }
        Ok(())
    }
}
