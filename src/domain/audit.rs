use super::actor::Actor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audit categories understood by the audit log.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum AuditKind {
    Create,
    Update,
    Delete,
    Process,
    Approval,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
pub enum AuditModule {
    Payroll,
    Loan,
    Settings,
}

impl fmt::Display for AuditModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Payroll => "Payroll",
            Self::Loan => "Loan",
            Self::Settings => "Settings",
        };
        f.write_str(s)
    }
}

/// A domain event describing one state change.
///
/// Lifecycle transitions return these instead of writing them anywhere; the
/// application layer hands them to an [`AuditSink`](super::ports::AuditSink)
/// once the record itself has been stored.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Human-readable summary, e.g. "Payroll processed".
    pub action: String,
    /// Display name of the actor.
    pub user: String,
    pub user_id: String,
    pub details: String,
    #[serde(rename = "type")]
    pub kind: AuditKind,
    pub module: AuditModule,
    pub record_id: String,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        module: AuditModule,
        kind: AuditKind,
        action: impl Into<String>,
        actor: &Actor,
        record_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            action: action.into(),
            user: actor.name.clone(),
            user_id: actor.id.clone(),
            details: String::new(),
            kind,
            module,
            record_id: record_id.into(),
            from_status: None,
            to_status: None,
            timestamp,
        }
    }

    pub fn with_transition(mut self, from: impl fmt::Display, to: impl fmt::Display) -> Self {
        self.from_status = Some(from.to_string());
        self.to_status = Some(to.to_string());
        self
    }

    /// Records the status a newly created record starts in.
    pub fn with_initial_status(mut self, status: impl fmt::Display) -> Self {
        self.from_status = None;
        self.to_status = Some(status.to_string());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }
}
