use super::component::{SalaryComponent, SalaryComponentSet};
use super::employee::Employee;
use super::money::Money;
use super::payroll::{PayrollRecord, Period};
use crate::error::{EngineError, Result};
use std::collections::BTreeMap;

/// Turns an employee's base salary into a pending payroll record.
///
/// The calculator is a pure function of its inputs: the same employee, set
/// and period always produce the same record, down to the serialized bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PayrollCalculator;

impl PayrollCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Computes a fresh pending record for `employee` in `period`.
    ///
    /// # Errors
    ///
    /// `InvalidPayrollComputation` if the period is invalid, the employee is
    /// inactive or has a non-positive base salary, or the deductions exceed
    /// the gross salary.
    pub fn compute_for_period(
        &self,
        employee: &Employee,
        components: &SalaryComponentSet,
        period: Period,
    ) -> Result<PayrollRecord> {
        period.validate()?;
        if !employee.status.is_payable() {
            return Err(EngineError::InvalidPayrollComputation(format!(
                "employee {} is {} and cannot be paid",
                employee.id, employee.status
            )));
        }

        let basic_salary = employee.base_salary;
        if !basic_salary.is_positive() {
            return Err(EngineError::InvalidPayrollComputation(format!(
                "employee {} has a non-positive base salary {basic_salary}",
                employee.id
            )));
        }

        let allowances = resolve_lines(components.earnings(), basic_salary);
        let deductions = resolve_lines(components.deductions(), basic_salary);

        PayrollRecord::pending(
            employee.id.clone(),
            period,
            basic_salary,
            allowances,
            deductions,
        )
    }

    /// Recomputes the record for an existing pending `record`.
    ///
    /// # Errors
    ///
    /// `PayrollLocked` if `existing` has been processed or paid; otherwise
    /// the same errors as [`compute_for_period`](Self::compute_for_period).
    pub fn recompute(
        &self,
        existing: &PayrollRecord,
        employee: &Employee,
        components: &SalaryComponentSet,
    ) -> Result<PayrollRecord> {
        existing.ensure_editable()?;
        if existing.employee() != &employee.id {
            return Err(EngineError::InvalidPayrollComputation(format!(
                "record {} belongs to {}, not {}",
                existing.id(),
                existing.employee(),
                employee.id
            )));
        }
        self.compute_for_period(employee, components, existing.period())
    }
}

fn resolve_lines<'a>(
    components: impl Iterator<Item = &'a SalaryComponent>,
    basic_salary: Money,
) -> BTreeMap<String, Money> {
    components
        .map(|c| (c.name.clone(), c.resolve(basic_salary)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::Actor;
    use crate::domain::component::{CalculationRule, SalaryComponent};
    use crate::domain::employee::EmployeeStatus;
    use crate::domain::money::Rate;
    use crate::domain::payroll::PayrollStatus;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn pct(v: rust_decimal::Decimal) -> CalculationRule {
        CalculationRule::PercentOfBase(Rate::new(v).unwrap())
    }

    fn scenario_set() -> SalaryComponentSet {
        SalaryComponentSet::new(vec![
            SalaryComponent::basic(CalculationRule::Fixed(Money::from_units(50_000))),
            SalaryComponent::earning("HRA", pct(dec!(0.10))),
            SalaryComponent::deduction("PF", pct(dec!(0.12))),
        ])
        .unwrap()
    }

    fn employee(base: i64) -> Employee {
        Employee::new("E1", Money::from_units(base), EmployeeStatus::Active)
    }

    fn march() -> Period {
        Period::new(2024, 3).unwrap()
    }

    #[test]
    fn test_basic_hra_pf_scenario() {
        let record = PayrollCalculator::new()
            .compute_for_period(&employee(50_000), &scenario_set(), march())
            .unwrap();

        assert_eq!(record.basic_salary(), Money::from_units(50_000));
        assert_eq!(record.allowances()["HRA"], Money::from_units(5_000));
        assert_eq!(record.deductions()["PF"], Money::from_units(6_000));
        assert_eq!(record.gross_salary(), Money::from_units(55_000));
        assert_eq!(record.total_deductions(), Money::from_units(6_000));
        assert_eq!(record.net_salary(), Money::from_units(49_000));
        assert_eq!(record.status(), PayrollStatus::Pending);
        assert!(!record.allowances().contains_key("Basic"));
    }

    #[test]
    fn test_statutory_default_breakdown() {
        let record = PayrollCalculator::new()
            .compute_for_period(
                &employee(40_000),
                &SalaryComponentSet::statutory_default(),
                march(),
            )
            .unwrap();

        // 40000 + 16000 HRA + 4000 DA + 1600 + 1250
        assert_eq!(record.gross_salary(), Money::from_units(62_850));
        // 4800 PF + 300 ESI + 4000 TDS + 200 PT
        assert_eq!(record.total_deductions(), Money::from_units(9_300));
        assert_eq!(record.net_salary(), Money::from_units(53_550));
    }

    #[test]
    fn test_deductions_exceeding_gross_fail() {
        let set = SalaryComponentSet::new(vec![
            SalaryComponent::basic(pct(dec!(1))),
            SalaryComponent::deduction("Loan recovery", pct(dec!(0.8))),
            SalaryComponent::deduction("TDS", pct(dec!(0.3))),
        ])
        .unwrap();
        let result = PayrollCalculator::new().compute_for_period(&employee(10_000), &set, march());
        assert!(matches!(
            result,
            Err(EngineError::InvalidPayrollComputation(_))
        ));
    }

    #[test]
    fn test_inactive_components_are_excluded() {
        let set = scenario_set().deactivate("PF").unwrap();
        let record = PayrollCalculator::new()
            .compute_for_period(&employee(50_000), &set, march())
            .unwrap();
        assert!(record.deductions().is_empty());
        assert_eq!(record.net_salary(), Money::from_units(55_000));
    }

    #[test]
    fn test_inactive_employee_rejected() {
        let mut e = employee(50_000);
        e.status = EmployeeStatus::Inactive;
        let result = PayrollCalculator::new().compute_for_period(&e, &scenario_set(), march());
        assert!(matches!(
            result,
            Err(EngineError::InvalidPayrollComputation(_))
        ));

        e.status = EmployeeStatus::OnLeave;
        assert!(
            PayrollCalculator::new()
                .compute_for_period(&e, &scenario_set(), march())
                .is_ok()
        );
    }

    #[test]
    fn test_zero_base_salary_rejected() {
        let result =
            PayrollCalculator::new().compute_for_period(&employee(0), &scenario_set(), march());
        assert!(matches!(
            result,
            Err(EngineError::InvalidPayrollComputation(_))
        ));
    }

    #[test]
    fn test_overflowing_gross_is_rejected() {
        let set = SalaryComponentSet::new(vec![
            SalaryComponent::basic(pct(dec!(1))),
            SalaryComponent::earning("Bonus", CalculationRule::Fixed(Money::from_units(1))),
        ])
        .unwrap();
        let employee = Employee::new(
            "E1",
            Money::new(rust_decimal::Decimal::MAX),
            EmployeeStatus::Active,
        );
        let result = PayrollCalculator::new().compute_for_period(&employee, &set, march());
        assert!(matches!(
            result,
            Err(EngineError::InvalidPayrollComputation(_))
        ));
    }

    #[test]
    fn test_computation_is_byte_identical() {
        let calculator = PayrollCalculator::new();
        let first = calculator
            .compute_for_period(&employee(50_000), &scenario_set(), march())
            .unwrap();
        let second = calculator
            .recompute(&first, &employee(50_000), &scenario_set())
            .unwrap();
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn test_snapshot_survives_salary_change() {
        let calculator = PayrollCalculator::new();
        let mut record = calculator
            .compute_for_period(&employee(50_000), &scenario_set(), march())
            .unwrap();
        record.finalize(&Actor::system(), Utc::now()).unwrap();

        let result = calculator.recompute(&record, &employee(70_000), &scenario_set());
        assert!(matches!(result, Err(EngineError::PayrollLocked { .. })));
        assert_eq!(record.basic_salary(), Money::from_units(50_000));
    }
}
