use super::engine::{PayrollEngine, rejected};
use crate::domain::actor::Actor;
use crate::domain::employee::EmployeeId;
use crate::domain::payroll::{PayrollAmendment, PayrollRecord, PayrollStatus, Period};
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// What happened to one employee in a batch payroll run.
#[derive(Debug)]
pub enum PayrollRunOutcome {
    /// A pending record was created or recomputed.
    Computed(PayrollRecord),
    /// The period's record is already processed or paid and was left alone.
    Skipped {
        employee: EmployeeId,
        status: PayrollStatus,
    },
    Failed {
        employee: EmployeeId,
        error: EngineError,
    },
}

impl PayrollRunOutcome {
    pub fn record(&self) -> Option<&PayrollRecord> {
        match self {
            Self::Computed(record) => Some(record),
            _ => None,
        }
    }
}

impl PayrollEngine {
    /// Computes the payroll of one employee for `period`.
    ///
    /// Creates the period's record if there is none, and recomputes it from
    /// the current base salary and component set if it is still pending. A
    /// recomputation that changes nothing writes nothing and emits no event.
    ///
    /// # Errors
    ///
    /// `UnknownEmployee` for an unresolvable reference, `PayrollLocked` if the
    /// record is processed or paid, and any calculator error.
    pub async fn run_payroll(
        &self,
        employee_id: &EmployeeId,
        period: Period,
        actor: &Actor,
    ) -> Result<PayrollRecord> {
        let employee = self.directory.resolve(employee_id).await?;
        let components = self.components().await?;
        let now = self.clock.now();
        let command = "run_payroll";

        match self.payroll_store.get_by_period(employee_id, period).await? {
            None => {
                let record = self
                    .calculator
                    .compute_for_period(&employee, &components, period)
                    .map_err(|e| rejected(command, employee_id.as_str(), e))?;
                debug!(
                    record = record.id(),
                    allowances = ?record.allowances(),
                    deductions = ?record.deductions(),
                    "payroll breakdown"
                );
                self.payroll_store.insert(record.clone()).await?;
                info!(
                    record = record.id(),
                    gross = %record.gross_salary(),
                    net = %record.net_salary(),
                    "payroll generated"
                );
                self.publish([record.created_event(actor, now)]).await;
                Ok(record)
            }
            Some(existing) => {
                let record = self
                    .calculator
                    .recompute(&existing, &employee, &components)
                    .map_err(|e| rejected(command, existing.id(), e))?;
                if record == existing {
                    debug!(record = record.id(), "payroll unchanged");
                    return Ok(existing);
                }
                self.payroll_store.update(record.clone()).await?;
                info!(
                    record = record.id(),
                    gross = %record.gross_salary(),
                    net = %record.net_salary(),
                    "payroll recalculated"
                );
                self.publish([record.recomputed_event(actor, now)]).await;
                Ok(record)
            }
        }
    }

    /// Runs payroll for every employee in the directory who is not inactive.
    ///
    /// One employee's failure never stops the run; the outcomes come back in
    /// directory order. Only a bad period or a directory failure aborts.
    pub async fn run_payroll_for_period(
        &self,
        period: Period,
        actor: &Actor,
    ) -> Result<Vec<PayrollRunOutcome>> {
        period.validate()?;
        let employees = self.directory.all().await?;
        let mut outcomes = Vec::with_capacity(employees.len());

        for employee in employees.into_iter().filter(|e| e.status.is_payable()) {
            let outcome = match self.run_payroll(&employee.id, period, actor).await {
                Ok(record) => PayrollRunOutcome::Computed(record),
                Err(EngineError::PayrollLocked { status, .. }) => PayrollRunOutcome::Skipped {
                    employee: employee.id,
                    status,
                },
                Err(error) => {
                    warn!(employee = %employee.id, %period, reason = %error, "payroll failed");
                    PayrollRunOutcome::Failed {
                        employee: employee.id,
                        error,
                    }
                }
            };
            outcomes.push(outcome);
        }

        info!(%period, employees = outcomes.len(), "payroll run complete");
        Ok(outcomes)
    }

    /// Applies a manual correction to a pending record.
    pub async fn amend_payroll(
        &self,
        record_id: &str,
        amendment: PayrollAmendment,
        actor: &Actor,
    ) -> Result<PayrollRecord> {
        let mut record = self.load_payroll(record_id).await?;
        let event = record
            .amend(amendment, actor, self.clock.now())
            .map_err(|e| rejected("amend_payroll", record_id, e))?;
        self.payroll_store.update(record.clone()).await?;
        info!(record = record_id, net = %record.net_salary(), "payroll amended");
        self.publish([event]).await;
        Ok(record)
    }

    /// `pending → processed`.
    pub async fn finalize_payroll(&self, record_id: &str, actor: &Actor) -> Result<PayrollRecord> {
        let mut record = self.load_payroll(record_id).await?;
        let event = record
            .finalize(actor, self.clock.now())
            .map_err(|e| rejected("finalize_payroll", record_id, e))?;
        self.payroll_store.update(record.clone()).await?;
        info!(record = record_id, "payroll processed");
        self.publish([event]).await;
        Ok(record)
    }

    /// `processed → paid`, dated `payment_date` or now.
    pub async fn mark_paid(
        &self,
        record_id: &str,
        payment_date: Option<DateTime<Utc>>,
        actor: &Actor,
    ) -> Result<PayrollRecord> {
        let mut record = self.load_payroll(record_id).await?;
        let event = record
            .mark_paid(actor, payment_date, self.clock.now())
            .map_err(|e| rejected("mark_paid", record_id, e))?;
        self.payroll_store.update(record.clone()).await?;
        info!(record = record_id, "payroll paid");
        self.publish([event]).await;
        Ok(record)
    }

    pub async fn payroll_record(&self, record_id: &str) -> Result<Option<PayrollRecord>> {
        self.payroll_store.get(record_id).await
    }

    /// Every record of `period`, ordered by employee.
    pub async fn payroll_register(&self, period: Period) -> Result<Vec<PayrollRecord>> {
        period.validate()?;
        let mut records = self.payroll_store.list_by_period(period).await?;
        records.sort_by(|a, b| a.employee().cmp(b.employee()));
        Ok(records)
    }

    async fn load_payroll(&self, record_id: &str) -> Result<PayrollRecord> {
        self.payroll_store
            .get(record_id)
            .await?
            .ok_or_else(|| EngineError::RecordNotFound(record_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::AuditKind;
    use crate::domain::component::{CalculationRule, SalaryComponent, SalaryComponentSet};
    use crate::domain::employee::{Employee, EmployeeStatus};
    use crate::domain::money::{Money, Rate};
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::in_memory::{
        InMemoryAuditLog, InMemoryComponentSetStore, InMemoryEmployeeDirectory,
        InMemoryLoanStore, InMemoryPayrollStore,
    };
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    struct Harness {
        engine: PayrollEngine,
        directory: InMemoryEmployeeDirectory,
        log: InMemoryAuditLog,
    }

    fn scenario_components() -> SalaryComponentSet {
        SalaryComponentSet::new(vec![
            SalaryComponent::basic(CalculationRule::Fixed(Money::from_units(50_000))),
            SalaryComponent::earning(
                "HRA",
                CalculationRule::PercentOfBase(Rate::new(dec!(0.10)).unwrap()),
            ),
            SalaryComponent::deduction(
                "PF",
                CalculationRule::PercentOfBase(Rate::new(dec!(0.12)).unwrap()),
            ),
        ])
        .unwrap()
    }

    async fn harness(employees: Vec<Employee>) -> Harness {
        let directory = InMemoryEmployeeDirectory::with_employees(employees);
        let components = InMemoryComponentSetStore::new();
        let log = InMemoryAuditLog::new();
        let engine = PayrollEngine::new(
            Box::new(directory.clone()),
            Box::new(components),
            Box::new(InMemoryPayrollStore::new()),
            Box::new(InMemoryLoanStore::new()),
            Box::new(log.clone()),
        )
        .with_clock(Box::new(FixedClock(
            Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap(),
        )));
        engine
            .configure_components(scenario_components(), &Actor::system())
            .await
            .unwrap();
        Harness {
            engine,
            directory,
            log,
        }
    }

    fn employee(id: &str, base: i64) -> Employee {
        Employee::new(id, Money::from_units(base), EmployeeStatus::Active)
    }

    fn march() -> Period {
        Period::new(2024, 3).unwrap()
    }

    #[tokio::test]
    async fn test_run_payroll_scenario() {
        let h = harness(vec![employee("E1", 50_000)]).await;
        let record = h
            .engine
            .run_payroll(&EmployeeId::new("E1"), march(), &Actor::system())
            .await
            .unwrap();

        assert_eq!(record.gross_salary(), Money::from_units(55_000));
        assert_eq!(record.total_deductions(), Money::from_units(6_000));
        assert_eq!(record.net_salary(), Money::from_units(49_000));
        assert_eq!(record.status(), PayrollStatus::Pending);

        let events = h.log.events().await;
        let last = events.last().unwrap();
        assert_eq!(last.kind, AuditKind::Create);
        assert_eq!(last.record_id, "E1/2024/03");
    }

    #[tokio::test]
    async fn test_run_payroll_unknown_employee() {
        let h = harness(vec![]).await;
        let result = h
            .engine
            .run_payroll(&EmployeeId::new("ghost"), march(), &Actor::system())
            .await;
        assert!(matches!(result, Err(EngineError::UnknownEmployee(_))));
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent_and_silent() {
        let h = harness(vec![employee("E1", 50_000)]).await;
        let actor = Actor::system();
        let first = h
            .engine
            .run_payroll(&EmployeeId::new("E1"), march(), &actor)
            .await
            .unwrap();
        let events_after_first = h.log.events().await.len();

        let second = h
            .engine
            .run_payroll(&EmployeeId::new("E1"), march(), &actor)
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(h.log.events().await.len(), events_after_first);
    }

    #[tokio::test]
    async fn test_rerun_picks_up_salary_change_while_pending() {
        let h = harness(vec![employee("E1", 50_000)]).await;
        let actor = Actor::system();
        h.engine
            .run_payroll(&EmployeeId::new("E1"), march(), &actor)
            .await
            .unwrap();

        h.directory.upsert(employee("E1", 60_000)).await;
        let record = h
            .engine
            .run_payroll(&EmployeeId::new("E1"), march(), &actor)
            .await
            .unwrap();
        assert_eq!(record.basic_salary(), Money::from_units(60_000));
        assert_eq!(record.gross_salary(), Money::from_units(66_000));
        assert_eq!(h.log.events().await.last().unwrap().kind, AuditKind::Update);
    }

    #[tokio::test]
    async fn test_rerun_after_finalize_is_locked() {
        let h = harness(vec![employee("E1", 50_000)]).await;
        let actor = Actor::system();
        let record = h
            .engine
            .run_payroll(&EmployeeId::new("E1"), march(), &actor)
            .await
            .unwrap();
        h.engine.finalize_payroll(record.id(), &actor).await.unwrap();

        let result = h
            .engine
            .run_payroll(&EmployeeId::new("E1"), march(), &actor)
            .await;
        assert!(matches!(result, Err(EngineError::PayrollLocked { .. })));
    }

    #[tokio::test]
    async fn test_rerun_after_payment_is_locked() {
        let h = harness(vec![employee("E1", 50_000)]).await;
        let actor = Actor::system();
        let record = h
            .engine
            .run_payroll(&EmployeeId::new("E1"), march(), &actor)
            .await
            .unwrap();
        h.engine.finalize_payroll(record.id(), &actor).await.unwrap();
        h.engine.mark_paid(record.id(), None, &actor).await.unwrap();
        h.directory.upsert(employee("E1", 60_000)).await;
        let events_before = h.log.events().await.len();

        let result = h
            .engine
            .run_payroll(&EmployeeId::new("E1"), march(), &actor)
            .await;
        assert!(matches!(
            result,
            Err(EngineError::PayrollLocked {
                status: PayrollStatus::Paid,
                ..
            })
        ));

        let outcomes = h
            .engine
            .run_payroll_for_period(march(), &actor)
            .await
            .unwrap();
        assert!(matches!(
            &outcomes[0],
            PayrollRunOutcome::Skipped { status: PayrollStatus::Paid, .. }
        ));

        let stored = h.engine.payroll_record(record.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), PayrollStatus::Paid);
        assert_eq!(stored.basic_salary(), Money::from_units(50_000));
        assert_eq!(stored.net_salary(), Money::from_units(49_000));
        assert_eq!(h.log.events().await.len(), events_before);
    }

    #[tokio::test]
    async fn test_full_lifecycle_emits_transition_events() {
        let h = harness(vec![employee("E1", 50_000)]).await;
        let actor = Actor::system();
        let record = h
            .engine
            .run_payroll(&EmployeeId::new("E1"), march(), &actor)
            .await
            .unwrap();

        let processed = h.engine.finalize_payroll(record.id(), &actor).await.unwrap();
        assert_eq!(processed.status(), PayrollStatus::Processed);
        assert!(processed.processed_at().is_some());

        let paid = h
            .engine
            .mark_paid(record.id(), None, &actor)
            .await
            .unwrap();
        assert_eq!(paid.status(), PayrollStatus::Paid);
        assert_eq!(
            paid.payment_date(),
            Some(Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap())
        );

        let events = h.log.events().await;
        let transitions: Vec<_> = events
            .iter()
            .filter(|e| e.record_id == "E1/2024/03")
            .map(|e| (e.from_status.clone(), e.to_status.clone()))
            .collect();
        assert_eq!(
            transitions,
            vec![
                (None, Some("pending".to_string())),
                (Some("pending".to_string()), Some("processed".to_string())),
                (Some("processed".to_string()), Some("paid".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_amend_paid_record_is_locked() {
        let h = harness(vec![employee("E1", 50_000)]).await;
        let actor = Actor::system();
        let record = h
            .engine
            .run_payroll(&EmployeeId::new("E1"), march(), &actor)
            .await
            .unwrap();
        h.engine.finalize_payroll(record.id(), &actor).await.unwrap();
        h.engine.mark_paid(record.id(), None, &actor).await.unwrap();
        let events_before = h.log.events().await.len();

        let result = h
            .engine
            .amend_payroll(
                record.id(),
                PayrollAmendment::BasicSalary(Money::from_units(1)),
                &actor,
            )
            .await;
        assert!(matches!(result, Err(EngineError::PayrollLocked { .. })));
        assert_eq!(h.log.events().await.len(), events_before);

        let stored = h.engine.payroll_record(record.id()).await.unwrap().unwrap();
        assert_eq!(stored.basic_salary(), Money::from_units(50_000));
    }

    #[tokio::test]
    async fn test_mark_paid_requires_processed() {
        let h = harness(vec![employee("E1", 50_000)]).await;
        let actor = Actor::system();
        let record = h
            .engine
            .run_payroll(&EmployeeId::new("E1"), march(), &actor)
            .await
            .unwrap();

        let result = h.engine.mark_paid(record.id(), None, &actor).await;
        assert!(matches!(
            result,
            Err(EngineError::InvalidPayrollTransition { .. })
        ));

        let missing = h.engine.finalize_payroll("E9/2024/03", &actor).await;
        assert!(matches!(missing, Err(EngineError::RecordNotFound(_))));
    }

    #[tokio::test]
    async fn test_amend_pending_record() {
        let h = harness(vec![employee("E1", 50_000)]).await;
        let actor = Actor::system();
        let record = h
            .engine
            .run_payroll(&EmployeeId::new("E1"), march(), &actor)
            .await
            .unwrap();

        let amended = h
            .engine
            .amend_payroll(
                record.id(),
                PayrollAmendment::SetAllowance {
                    name: "Bonus".to_string(),
                    amount: Money::from_units(1_000),
                },
                &actor,
            )
            .await
            .unwrap();
        assert_eq!(amended.gross_salary(), Money::from_units(56_000));
        assert_eq!(amended.net_salary(), Money::from_units(50_000));
        assert_eq!(amended.status(), PayrollStatus::Pending);
    }

    #[tokio::test]
    async fn test_batch_run_isolates_failures() {
        let mut on_leave = employee("E3", 30_000);
        on_leave.status = EmployeeStatus::OnLeave;
        let mut inactive = employee("E4", 30_000);
        inactive.status = EmployeeStatus::Inactive;
        let zero = employee("E2", 0);
        let h = harness(vec![employee("E1", 50_000), zero, on_leave, inactive]).await;
        let actor = Actor::system();

        let outcomes = h
            .engine
            .run_payroll_for_period(march(), &actor)
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(&outcomes[0], PayrollRunOutcome::Computed(r) if r.employee().as_str() == "E1"));
        assert!(matches!(
            &outcomes[1],
            PayrollRunOutcome::Failed { error: EngineError::InvalidPayrollComputation(_), .. }
        ));
        assert!(matches!(&outcomes[2], PayrollRunOutcome::Computed(r) if r.employee().as_str() == "E3"));

        h.engine.finalize_payroll("E1/2024/03", &actor).await.unwrap();
        let rerun = h
            .engine
            .run_payroll_for_period(march(), &actor)
            .await
            .unwrap();
        assert!(matches!(
            &rerun[0],
            PayrollRunOutcome::Skipped { status: PayrollStatus::Processed, .. }
        ));

        let register = h.engine.payroll_register(march()).await.unwrap();
        let ids: Vec<_> = register.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["E1/2024/03", "E3/2024/03"]);
    }

    #[tokio::test]
    async fn test_batch_run_rejects_invalid_period() {
        let h = harness(vec![employee("E1", 50_000)]).await;
        let result = h
            .engine
            .run_payroll_for_period(Period { year: 2024, month: 13 }, &Actor::system())
            .await;
        assert!(matches!(
            result,
            Err(EngineError::InvalidPayrollComputation(_))
        ));
    }
}
