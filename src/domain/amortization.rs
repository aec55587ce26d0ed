//! EMI computation and repayment schedules.
//!
//! Interest-free loans divide the principal evenly, rounding the installment
//! up and letting the last one absorb the remainder. Interest-bearing loans
//! use the reducing-balance formula
//!
//! ```text
//! EMI = P * r * (1 + r)^n / ((1 + r)^n - 1)
//! ```
//!
//! with `r` the monthly rate. Every schedule ends on a zero balance.

use super::money::Money;
use crate::error::{EngineError, Result};
use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub const MAX_TENURE_MONTHS: u32 = 60;
pub const MAX_ANNUAL_RATE_PERCENT: Decimal = dec!(100);

/// Validated principal, annual interest rate and tenure of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanTerms {
    principal: Money,
    annual_rate_percent: Decimal,
    tenure_months: u32,
}

impl LoanTerms {
    /// # Errors
    ///
    /// `InvalidLoanParameters` unless `principal > 0`, `tenure_months` is in
    /// `[1, 60]` and `annual_rate_percent` is in `[0, 100]`.
    pub fn new(principal: Money, annual_rate_percent: Decimal, tenure_months: u32) -> Result<Self> {
        if !principal.is_positive() {
            return Err(EngineError::InvalidLoanParameters(format!(
                "principal must be positive, got {principal}"
            )));
        }
        if !(1..=MAX_TENURE_MONTHS).contains(&tenure_months) {
            return Err(EngineError::InvalidLoanParameters(format!(
                "tenure of {tenure_months} months is outside 1-{MAX_TENURE_MONTHS}"
            )));
        }
        if annual_rate_percent < Decimal::ZERO || annual_rate_percent > MAX_ANNUAL_RATE_PERCENT {
            return Err(EngineError::InvalidLoanParameters(format!(
                "annual interest rate {annual_rate_percent}% is outside 0-{MAX_ANNUAL_RATE_PERCENT}%"
            )));
        }
        Ok(Self {
            principal,
            annual_rate_percent,
            tenure_months,
        })
    }

    pub fn principal(&self) -> Money {
        self.principal
    }

    pub fn annual_rate_percent(&self) -> Decimal {
        self.annual_rate_percent
    }

    pub fn tenure_months(&self) -> u32 {
        self.tenure_months
    }

    pub fn is_interest_free(&self) -> bool {
        self.annual_rate_percent.is_zero()
    }

    pub fn monthly_rate(&self) -> Decimal {
        self.annual_rate_percent / dec!(1200)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// 1-based installment number.
    pub installment: u32,
    pub due_date: Option<NaiveDate>,
    /// Amount due: `interest + principal`.
    pub emi: Money,
    pub interest: Money,
    pub principal: Money,
    /// Outstanding principal after this installment.
    pub balance: Money,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationSchedule {
    emi_amount: Money,
    entries: Vec<ScheduleEntry>,
}

impl AmortizationSchedule {
    /// The regular installment. The final entry may be smaller.
    pub fn emi_amount(&self) -> Money {
        self.emi_amount
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn total_interest(&self) -> Money {
        self.entries.iter().map(|e| e.interest).sum()
    }

    pub fn total_principal(&self) -> Money {
        self.entries.iter().map(|e| e.principal).sum()
    }

    pub fn total_payable(&self) -> Money {
        self.entries.iter().map(|e| e.emi).sum()
    }

    /// Assigns due dates, the first installment falling one month after `start`.
    pub fn with_start_date(mut self, start: NaiveDate) -> Self {
        for entry in &mut self.entries {
            entry.due_date = start.checked_add_months(Months::new(entry.installment));
        }
        self
    }
}

/// Computes and checks repayment schedules.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoanAmortizer;

impl LoanAmortizer {
    /// Validates the parameters and computes the schedule in one step.
    pub fn compute_schedule(
        principal: Money,
        annual_rate_percent: Decimal,
        tenure_months: u32,
    ) -> Result<AmortizationSchedule> {
        let terms = LoanTerms::new(principal, annual_rate_percent, tenure_months)?;
        Ok(Self::schedule(&terms))
    }

    pub fn schedule(terms: &LoanTerms) -> AmortizationSchedule {
        if terms.is_interest_free() {
            Self::flat_schedule(terms)
        } else {
            Self::reducing_balance_schedule(terms)
        }
    }

    /// The EMI `terms` produce, without building the full schedule.
    pub fn emi(terms: &LoanTerms) -> Money {
        if terms.is_interest_free() {
            flat_emi(terms)
        } else {
            reducing_balance_emi(terms)
        }
    }

    fn flat_schedule(terms: &LoanTerms) -> AmortizationSchedule {
        // ceil(P / n) can settle the loan before the n-th month for tiny principals
        Self::build(terms, flat_emi(terms))
    }

    fn reducing_balance_schedule(terms: &LoanTerms) -> AmortizationSchedule {
        Self::build(terms, reducing_balance_emi(terms))
    }

    fn build(terms: &LoanTerms, emi: Money) -> AmortizationSchedule {
        let mut balance = terms.principal;
        let mut entries = Vec::with_capacity(terms.tenure_months as usize);

        for installment in 1..=terms.tenure_months {
            if balance.is_zero() {
                break;
            }
            let (interest, principal) = Self::split_installment(terms, emi, installment, balance);
            balance -= principal;
            entries.push(ScheduleEntry {
                installment,
                due_date: None,
                emi: interest + principal,
                interest,
                principal,
                balance,
            });
        }

        AmortizationSchedule {
            emi_amount: emi,
            entries,
        }
    }

    /// Splits installment number `installment` into `(interest, principal)`
    /// against the outstanding `balance`.
    ///
    /// Interest is charged on `balance`, so a prepaid loan pays interest on
    /// what is actually left. The principal part is capped at `balance` and
    /// the final installment of the tenure clears it.
    pub fn split_installment(
        terms: &LoanTerms,
        emi: Money,
        installment: u32,
        balance: Money,
    ) -> (Money, Money) {
        let interest = Money::new(balance.value() * terms.monthly_rate()).round_half_up();
        let principal = if installment >= terms.tenure_months {
            balance
        } else {
            (emi - interest).max(Money::ZERO).min(balance)
        };
        (interest, principal)
    }

    /// Checks that `schedule` repays exactly `principal`.
    ///
    /// Each entry must satisfy `emi == interest + principal`, balances must
    /// never grow, and the last balance must be zero.
    pub fn validate_schedule(schedule: &AmortizationSchedule, principal: Money) -> Result<()> {
        let Some(last) = schedule.entries.last() else {
            return Err(EngineError::InvalidLoanParameters(
                "schedule has no installments".to_string(),
            ));
        };

        let mut previous = principal;
        for entry in &schedule.entries {
            if entry.emi != entry.interest + entry.principal {
                return Err(EngineError::InvalidLoanParameters(format!(
                    "installment {} does not split into interest and principal",
                    entry.installment
                )));
            }
            if entry.principal.is_negative() || entry.balance > previous {
                return Err(EngineError::InvalidLoanParameters(format!(
                    "installment {} increases the outstanding balance",
                    entry.installment
                )));
            }
            if previous - entry.principal != entry.balance {
                return Err(EngineError::InvalidLoanParameters(format!(
                    "installment {} balance does not match its principal",
                    entry.installment
                )));
            }
            previous = entry.balance;
        }

        if schedule.total_principal() != principal || !last.balance.is_zero() {
            return Err(EngineError::InvalidLoanParameters(format!(
                "schedule repays {} of principal {principal}",
                schedule.total_principal()
            )));
        }
        Ok(())
    }
}

fn flat_emi(terms: &LoanTerms) -> Money {
    Money::new(terms.principal.value() / Decimal::from(terms.tenure_months)).ceil()
}

fn reducing_balance_emi(terms: &LoanTerms) -> Money {
    let rate = terms.monthly_rate();
    let growth = (0..terms.tenure_months).fold(Decimal::ONE, |acc, _| acc * (Decimal::ONE + rate));
    let emi = Money::new(terms.principal.value() * rate * growth / (growth - Decimal::ONE))
        .round_half_up();
    // the first month's interest is the largest, so this keeps every
    // installment paying down at least one unit of principal
    let first_interest = Money::new(terms.principal.value() * rate).round_half_up();
    emi.max(first_interest + Money::from_units(1))
}
