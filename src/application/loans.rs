use super::engine::{PayrollEngine, rejected};
use crate::domain::actor::Actor;
use crate::domain::amortization::LoanTerms;
use crate::domain::employee::EmployeeId;
use crate::domain::loan::{LoanId, LoanPayment, LoanRecord, LoanType};
use crate::domain::money::Money;
use crate::error::{EngineError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;

impl PayrollEngine {
    /// Files a pending loan for an employee after checking the terms and the
    /// loan policy.
    ///
    /// # Errors
    ///
    /// `UnknownEmployee` if the employee cannot be resolved and
    /// `InvalidLoanParameters` for bad terms or a principal above the
    /// employee's limit.
    pub async fn request_loan(
        &self,
        employee_id: &EmployeeId,
        loan_type: LoanType,
        principal: Money,
        annual_rate_percent: Decimal,
        tenure_months: u32,
        actor: &Actor,
    ) -> Result<LoanRecord> {
        let employee = self.directory.resolve(employee_id).await?;
        let command = "request_loan";
        let terms = LoanTerms::new(principal, annual_rate_percent, tenure_months)
            .map_err(|e| rejected(command, employee_id.as_str(), e))?;
        self.loan_policy
            .check_eligibility(&employee, loan_type, principal)
            .map_err(|e| rejected(command, employee_id.as_str(), e))?;

        let now = self.clock.now();
        let loan = LoanRecord::request(LoanId::generate(), employee.id, loan_type, terms, now);
        self.loan_store.insert(loan.clone()).await?;
        info!(
            loan = %loan.id(),
            employee = %employee_id,
            principal = %principal,
            emi = %loan.emi_amount(),
            "loan requested"
        );
        self.publish([loan.requested_event(actor, now)]).await;
        Ok(loan)
    }

    pub async fn approve_loan(&self, loan_id: &LoanId, actor: &Actor) -> Result<LoanRecord> {
        let mut loan = self.load_loan(loan_id).await?;
        let event = loan
            .approve(actor, self.clock.now())
            .map_err(|e| rejected("approve_loan", loan_id.as_str(), e))?;
        self.loan_store.update(loan.clone()).await?;
        info!(loan = %loan_id, approver = %actor.id, "loan approved");
        self.publish([event]).await;
        Ok(loan)
    }

    pub async fn reject_loan(
        &self,
        loan_id: &LoanId,
        reason: Option<String>,
        actor: &Actor,
    ) -> Result<LoanRecord> {
        let mut loan = self.load_loan(loan_id).await?;
        let event = loan
            .reject(actor, reason, self.clock.now())
            .map_err(|e| rejected("reject_loan", loan_id.as_str(), e))?;
        self.loan_store.update(loan.clone()).await?;
        info!(loan = %loan_id, "loan rejected");
        self.publish([event]).await;
        Ok(loan)
    }

    /// Disburses an approved loan; the first installment falls due one month
    /// after `start_date`.
    pub async fn activate_loan(
        &self,
        loan_id: &LoanId,
        start_date: NaiveDate,
        actor: &Actor,
    ) -> Result<LoanRecord> {
        let mut loan = self.load_loan(loan_id).await?;
        let event = loan
            .activate(actor, start_date, self.clock.now())
            .map_err(|e| rejected("activate_loan", loan_id.as_str(), e))?;
        self.loan_store.update(loan.clone()).await?;
        info!(loan = %loan_id, %start_date, "loan disbursed");
        self.publish([event]).await;
        Ok(loan)
    }

    /// Deducts the next scheduled EMI.
    pub async fn deduct_emi(&self, loan_id: &LoanId, actor: &Actor) -> Result<LoanPayment> {
        let mut loan = self.load_loan(loan_id).await?;
        let (payment, events) = loan
            .apply_emi(actor, self.clock.now())
            .map_err(|e| rejected("deduct_emi", loan_id.as_str(), e))?;
        self.loan_store.update(loan).await?;
        log_payment("EMI deducted", &payment);
        self.publish(events).await;
        Ok(payment)
    }

    /// Applies an ad-hoc principal prepayment.
    pub async fn repay_loan(
        &self,
        loan_id: &LoanId,
        amount: Money,
        actor: &Actor,
    ) -> Result<LoanPayment> {
        let mut loan = self.load_loan(loan_id).await?;
        let (payment, events) = loan
            .repay(amount, actor, self.clock.now())
            .map_err(|e| rejected("repay_loan", loan_id.as_str(), e))?;
        self.loan_store.update(loan).await?;
        log_payment("loan repayment", &payment);
        self.publish(events).await;
        Ok(payment)
    }

    pub async fn loan(&self, loan_id: &LoanId) -> Result<Option<LoanRecord>> {
        self.loan_store.get(loan_id).await
    }

    pub async fn loans_for(&self, employee_id: &EmployeeId) -> Result<Vec<LoanRecord>> {
        self.loan_store.list_by_employee(employee_id).await
    }

    async fn load_loan(&self, loan_id: &LoanId) -> Result<LoanRecord> {
        self.loan_store
            .get(loan_id)
            .await?
            .ok_or_else(|| EngineError::RecordNotFound(loan_id.to_string()))
    }
}

fn log_payment(action: &str, payment: &LoanPayment) {
    info!(
        loan = %payment.loan_id,
        principal = %payment.principal,
        interest = %payment.interest,
        remaining = %payment.remaining_after,
        completed = payment.completed,
        "{action}"
    );
}
