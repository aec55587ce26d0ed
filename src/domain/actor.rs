use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Admin,
    Hr,
    Manager,
    Employee,
}

/// The user on whose behalf a command runs. Recorded on every audit event.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    /// The identity used by batch jobs and the command-line tool.
    pub fn system() -> Self {
        Self::new("system", "System", ActorRole::Admin)
    }

    /// Whether this actor may approve, reject or disburse loans.
    pub fn can_decide_loans(&self) -> bool {
        matches!(self.role, ActorRole::Admin | ActorRole::Hr)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loan_decision_roles() {
        assert!(Actor::new("1", "a", ActorRole::Admin).can_decide_loans());
        assert!(Actor::new("2", "h", ActorRole::Hr).can_decide_loans());
        assert!(!Actor::new("3", "m", ActorRole::Manager).can_decide_loans());
        assert!(!Actor::new("4", "e", ActorRole::Employee).can_decide_loans());
    }
}
