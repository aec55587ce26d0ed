use crate::domain::component::{CalculationRule, ComponentKind, SalaryComponent, SalaryComponentSet};
use crate::domain::money::{Money, Rate};
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
enum RuleColumn {
    Fixed,
    PercentOfBase,
}

#[derive(Debug, Deserialize)]
struct ComponentRow {
    name: String,
    kind: ComponentKind,
    rule: RuleColumn,
    value: Decimal,
    taxable: Option<bool>,
    active: Option<bool>,
    basic: Option<bool>,
}

impl TryFrom<ComponentRow> for SalaryComponent {
    type Error = EngineError;

    fn try_from(row: ComponentRow) -> Result<Self> {
        let rule = match row.rule {
            RuleColumn::Fixed => CalculationRule::Fixed(Money::new(row.value)),
            RuleColumn::PercentOfBase => CalculationRule::PercentOfBase(Rate::new(row.value)?),
        };
        Ok(Self {
            name: row.name,
            kind: row.kind,
            rule,
            taxable: row.taxable.unwrap_or(row.kind == ComponentKind::Earning),
            active: row.active.unwrap_or(true),
            basic: row.basic.unwrap_or(false),
        })
    }
}

/// Reads a salary component set from a CSV source with a
/// `name,kind,rule,value,taxable,active,basic` header.
///
/// `rule` is `fixed` or `percent_of_base`; percentages are written as
/// fractions (`0.12`). Blank flags default to taxable earnings, active, not
/// basic.
pub struct ComponentReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> ComponentReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn components(self) -> impl Iterator<Item = Result<SalaryComponent>> {
        self.reader.into_deserialize().map(|row| {
            let row: ComponentRow = row.map_err(EngineError::from)?;
            SalaryComponent::try_from(row)
        })
    }

    /// Reads every row and validates the result as one set. The first bad row
    /// fails the whole set.
    pub fn read_set(self) -> Result<SalaryComponentSet> {
        let components = self.components().collect::<Result<Vec<_>>>()?;
        SalaryComponentSet::new(components)
    }
}
