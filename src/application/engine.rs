use crate::domain::actor::Actor;
use crate::domain::audit::{AuditEvent, AuditKind, AuditModule};
use crate::domain::calculator::PayrollCalculator;
use crate::domain::component::SalaryComponentSet;
use crate::domain::loan::LoanPolicy;
use crate::domain::ports::{
    AuditSinkBox, ClockBox, ComponentSetStoreBox, EmployeeDirectoryBox, LoanStoreBox,
    PayrollStoreBox,
};
use crate::error::{EngineError, Result};
use crate::infrastructure::clock::SystemClock;
use tracing::{info, warn};

/// The main entry point for payroll and loan processing.
///
/// `PayrollEngine` owns the storage backends and runs each command as a
/// sequence of awaited steps: load the record, apply the domain transition,
/// store the result, then publish the audit events the transition produced.
/// Nothing is published for a command that fails. Once the store write has
/// succeeded the command counts as applied: a failing audit sink is logged
/// and does not turn it into an error.
///
/// The payroll commands live in [`super::payroll`], the loan commands in
/// [`super::loans`].
pub struct PayrollEngine {
    pub(super) directory: EmployeeDirectoryBox,
    pub(super) component_store: ComponentSetStoreBox,
    pub(super) payroll_store: PayrollStoreBox,
    pub(super) loan_store: LoanStoreBox,
    pub(super) audit: AuditSinkBox,
    pub(super) clock: ClockBox,
    pub(super) calculator: PayrollCalculator,
    pub(super) loan_policy: LoanPolicy,
}

impl PayrollEngine {
    /// Creates a new `PayrollEngine` on the system clock and the default loan
    /// policy.
    ///
    /// # Arguments
    ///
    /// * `directory` - Resolves employee references.
    /// * `component_store` - Holds the configured salary component set.
    /// * `payroll_store` - The store for payroll records.
    /// * `loan_store` - The store for loan records.
    /// * `audit` - Receives an event for every applied transition.
    pub fn new(
        directory: EmployeeDirectoryBox,
        component_store: ComponentSetStoreBox,
        payroll_store: PayrollStoreBox,
        loan_store: LoanStoreBox,
        audit: AuditSinkBox,
    ) -> Self {
        Self {
            directory,
            component_store,
            payroll_store,
            loan_store,
            audit,
            clock: Box::new(SystemClock),
            calculator: PayrollCalculator::new(),
            loan_policy: LoanPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: ClockBox) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_loan_policy(mut self, policy: LoanPolicy) -> Self {
        self.loan_policy = policy;
        self
    }

    pub fn loan_policy(&self) -> &LoanPolicy {
        &self.loan_policy
    }

    /// Replaces the salary component set used by subsequent payroll runs.
    ///
    /// The set was validated when it was built, so this only stores it and
    /// records a settings event.
    pub async fn configure_components(
        &self,
        set: SalaryComponentSet,
        actor: &Actor,
    ) -> Result<()> {
        let details = set
            .active()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let count = set.components().len();
        self.component_store.save(set).await?;

        info!(components = count, actor = %actor.id, "salary components configured");
        let event = AuditEvent::new(
            AuditModule::Settings,
            AuditKind::Update,
            "Salary components updated",
            actor,
            "components",
            self.clock.now(),
        )
        .with_details(format!("active: {details}"));
        self.publish([event]).await;
        Ok(())
    }

    /// The configured component set, or the statutory default when nothing
    /// has been configured yet.
    pub async fn components(&self) -> Result<SalaryComponentSet> {
        Ok(self
            .component_store
            .load()
            .await?
            .unwrap_or_else(SalaryComponentSet::statutory_default))
    }

    pub(super) async fn publish(&self, events: impl IntoIterator<Item = AuditEvent>) {
        for event in events {
            let (action, record) = (event.action.clone(), event.record_id.clone());
            if let Err(e) = self.audit.record(event).await {
                warn!(
                    action = %action,
                    record = %record,
                    kind = e.kind(),
                    reason = %e,
                    "audit event not recorded"
                );
            }
        }
    }
}

/// Logs a command the domain refused and hands the error back.
pub(super) fn rejected(command: &str, record: &str, error: EngineError) -> EngineError {
    warn!(
        command,
        record,
        kind = error.kind(),
        reason = %error,
        "command rejected"
    );
    error
}
