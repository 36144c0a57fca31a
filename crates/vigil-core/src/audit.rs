//! Audit-event sink collaborator.
//!
//! The sink is fire-and-forget: implementations must never block the caller
//! beyond their own bounded work and must never surface errors into the
//! orchestration path. The registry records omissions via `tracing` when a
//! sink call fails internally.

use async_trait::async_trait;
use serde_json::Value;

/// Fire-and-forget audit sink.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Records an audit event. Infallible by contract; implementations
    /// swallow and log their own failures.
    async fn log_event(
        &self,
        event_type: &str,
        action: &str,
        resource_type: &str,
        resource_id: &str,
        metadata: Value,
    );
}

/// Sink that drops all events, for tests and minimal deployments.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn log_event(&self, _: &str, _: &str, _: &str, _: &str, _: Value) {}
}
