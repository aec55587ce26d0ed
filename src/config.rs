use crate::domain::component::SalaryComponentSet;
use crate::domain::loan::LoanPolicy;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Engine settings loaded from a JSON file.
///
/// Every field is optional in the file; missing fields fall back to the
/// default loan policy and the statutory component set.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub loan_policy: LoanPolicy,
    pub components: Option<SalaryComponentSet>,
}

impl EngineConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn component_set(&self) -> SalaryComponentSet {
        self.components
            .clone()
            .unwrap_or_else(SalaryComponentSet::statutory_default)
    }
}
