use crate::domain::audit::AuditEvent;
use crate::domain::ports::AuditSink;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Writes every audit event as a structured `tracing` record under the
/// `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) -> Result<()> {
        info!(
            target: "audit",
            module = %event.module,
            kind = ?event.kind,
            record = %event.record_id,
            user = %event.user_id,
            from = event.from_status.as_deref().unwrap_or("-"),
            to = event.to_status.as_deref().unwrap_or("-"),
            details = %event.details,
            "{}",
            event.action
        );
        Ok(())
    }
}
