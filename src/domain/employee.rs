use super::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to an employee record owned by the employee directory.
///
/// Records only ever hold this id; the full [`Employee`] is obtained through
/// [`EmployeeDirectory::resolve`](super::ports::EmployeeDirectory::resolve).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(String);

impl EmployeeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EmployeeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeStatus {
    Active,
    Probation,
    OnLeave,
    Inactive,
}

impl EmployeeStatus {
    /// Inactive employees are excluded from payroll runs.
    pub fn is_payable(&self) -> bool {
        !matches!(self, Self::Inactive)
    }
}

impl fmt::Display for EmployeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Probation => "probation",
            Self::OnLeave => "onleave",
            Self::Inactive => "inactive",
        };
        f.write_str(s)
    }
}

/// The slice of an employee record the engine reads.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    /// Monthly base salary.
    pub base_salary: Money,
    pub status: EmployeeStatus,
}

impl Employee {
    pub fn new(id: impl Into<EmployeeId>, base_salary: Money, status: EmployeeStatus) -> Self {
        Self {
            id: id.into(),
            base_salary,
            status,
        }
    }
}

impl From<String> for EmployeeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&EmployeeStatus::OnLeave).unwrap();
        assert_eq!(json, "\"onleave\"");
        let status: EmployeeStatus = serde_json::from_str("\"probation\"").unwrap();
        assert_eq!(status, EmployeeStatus::Probation);
    }

    #[test]
    fn test_only_inactive_is_not_payable() {
        assert!(EmployeeStatus::Active.is_payable());
        assert!(EmployeeStatus::Probation.is_payable());
        assert!(EmployeeStatus::OnLeave.is_payable());
        assert!(!EmployeeStatus::Inactive.is_payable());
    }
}
