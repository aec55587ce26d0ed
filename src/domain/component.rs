//! Salary components and the validated set the payroll calculator works from.

use super::money::{Money, Rate};
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Earning,
    Deduction,
}

/// How a component's amount is derived from the base salary.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum CalculationRule {
    Fixed(Money),
    PercentOfBase(Rate),
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SalaryComponent {
    pub name: String,
    pub kind: ComponentKind,
    pub rule: CalculationRule,
    pub taxable: bool,
    pub active: bool,
    /// Marks the earning that represents basic pay. Its amount is the base
    /// salary snapshot, so it is never added to gross a second time.
    #[serde(default)]
    pub basic: bool,
}

impl SalaryComponent {
    pub fn earning(name: impl Into<String>, rule: CalculationRule) -> Self {
        Self {
            name: name.into(),
            kind: ComponentKind::Earning,
            rule,
            taxable: true,
            active: true,
            basic: false,
        }
    }

    pub fn deduction(name: impl Into<String>, rule: CalculationRule) -> Self {
        Self {
            name: name.into(),
            kind: ComponentKind::Deduction,
            rule,
            taxable: false,
            active: true,
            basic: false,
        }
    }

    /// The basic-pay earning.
    ///
    /// Payroll always takes basic pay from the employee's base salary, so
    /// `rule` is informational: either 100% of base or a positive fixed
    /// reference amount.
    pub fn basic(rule: CalculationRule) -> Self {
        Self {
            basic: true,
            ..Self::earning("Basic", rule)
        }
    }

    pub fn with_taxable(mut self, taxable: bool) -> Self {
        self.taxable = taxable;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Resolves the component amount against `base_salary`.
    ///
    /// Fixed amounts are returned unchanged, percentages are rounded half-up
    /// to whole units. Inactive components resolve to zero.
    pub fn resolve(&self, base_salary: Money) -> Money {
        if !self.active {
            return Money::ZERO;
        }
        match self.rule {
            CalculationRule::Fixed(amount) => amount,
            CalculationRule::PercentOfBase(rate) => base_salary.percent(rate),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(invalid("component name must not be empty".to_string()));
        }
        if let CalculationRule::Fixed(amount) = self.rule
            && amount.is_negative()
        {
            return Err(invalid(format!(
                "component {} has a negative fixed amount {amount}",
                self.name
            )));
        }
        if self.basic {
            if self.kind != ComponentKind::Earning {
                return Err(invalid(format!(
                    "component {} is a deduction and cannot be basic pay",
                    self.name
                )));
            }
            match self.rule {
                CalculationRule::Fixed(amount) if !amount.is_positive() => {
                    return Err(invalid(format!(
                        "basic pay component {} must have a positive reference amount",
                        self.name
                    )));
                }
                CalculationRule::PercentOfBase(rate) if rate.value() != Decimal::ONE => {
                    return Err(invalid(format!(
                        "basic pay component {} must be 100% of base, got {}",
                        self.name,
                        rate.value()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// An ordered, validated list of salary components.
///
/// Construction is the only place configuration errors surface: once a set
/// exists every component in it can be resolved without failing. Inactive
/// components stay in the set so historical configuration remains visible.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(try_from = "Vec<SalaryComponent>", into = "Vec<SalaryComponent>")]
pub struct SalaryComponentSet {
    components: Vec<SalaryComponent>,
}

impl SalaryComponentSet {
    /// Validates and builds a component set.
    ///
    /// Fails with `InvalidComponentConfiguration` when a name is empty or
    /// repeated, a fixed amount is negative, or there is not exactly one
    /// active basic-pay earning.
    pub fn new(components: Vec<SalaryComponent>) -> Result<Self> {
        let mut names = HashSet::new();
        for component in &components {
            component.validate()?;
            if !names.insert(component.name.trim().to_lowercase()) {
                return Err(invalid(format!(
                    "component {} is defined more than once",
                    component.name
                )));
            }
        }

        let basics = components.iter().filter(|c| c.basic && c.active).count();
        match basics {
            1 => Ok(Self { components }),
            0 => Err(invalid(
                "an active basic pay earning component is required".to_string(),
            )),
            n => Err(invalid(format!(
                "{n} active basic pay components configured, expected exactly one"
            ))),
        }
    }

    /// The component set used when nothing else is configured.
    ///
    /// Mirrors the statutory structure of the seed data: basic, HRA and DA as
    /// percentages of base, two fixed allowances, and PF, ESI, TDS and PT
    /// deductions.
    pub fn statutory_default() -> Self {
        let pct = |v| CalculationRule::PercentOfBase(Rate::new_unchecked(v));
        let fixed = |units| CalculationRule::Fixed(Money::from_units(units));
        Self {
            components: vec![
                SalaryComponent::basic(pct(dec!(1))),
                SalaryComponent::earning("HRA", pct(dec!(0.40))),
                SalaryComponent::earning("DA", pct(dec!(0.10))),
                SalaryComponent::earning("Conveyance", fixed(1_600)).with_taxable(false),
                SalaryComponent::earning("Medical", fixed(1_250)).with_taxable(false),
                SalaryComponent::deduction("PF", pct(dec!(0.12))),
                SalaryComponent::deduction("ESI", pct(dec!(0.0075))),
                SalaryComponent::deduction("TDS", pct(dec!(0.10))),
                SalaryComponent::deduction("PT", fixed(200)),
            ],
        }
    }

    pub fn components(&self) -> &[SalaryComponent] {
        &self.components
    }

    pub fn get(&self, name: &str) -> Option<&SalaryComponent> {
        self.components
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn active(&self) -> impl Iterator<Item = &SalaryComponent> {
        self.components.iter().filter(|c| c.active)
    }

    /// Active earnings other than basic pay.
    pub fn earnings(&self) -> impl Iterator<Item = &SalaryComponent> {
        self.active()
            .filter(|c| c.kind == ComponentKind::Earning && !c.basic)
    }

    pub fn deductions(&self) -> impl Iterator<Item = &SalaryComponent> {
        self.active().filter(|c| c.kind == ComponentKind::Deduction)
    }

    pub fn basic_component(&self) -> Option<&SalaryComponent> {
        self.active().find(|c| c.basic)
    }

    /// Resolves the named component, or `None` if the set has no such component.
    pub fn resolve(&self, name: &str, base_salary: Money) -> Option<Money> {
        self.get(name).map(|c| c.resolve(base_salary))
    }

    /// Returns a new set with `component` appended, revalidated.
    pub fn with_component(&self, component: SalaryComponent) -> Result<Self> {
        let mut components = self.components.clone();
        components.push(component);
        Self::new(components)
    }

    /// Returns a new set with the named component switched off.
    pub fn deactivate(&self, name: &str) -> Result<Self> {
        let mut components = self.components.clone();
        let component = components
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| invalid(format!("no component named {name}")))?;
        component.active = false;
        Self::new(components)
    }
}

impl TryFrom<Vec<SalaryComponent>> for SalaryComponentSet {
    type Error = EngineError;

    fn try_from(components: Vec<SalaryComponent>) -> Result<Self> {
        Self::new(components)
    }
}

impl From<SalaryComponentSet> for Vec<SalaryComponent> {
    fn from(set: SalaryComponentSet) -> Self {
        set.components
    }
}

fn invalid(message: String) -> EngineError {
    EngineError::InvalidComponentConfiguration(message)
}
