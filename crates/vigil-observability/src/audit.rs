//! Audit trail for Vigil.
//!
//! A bounded in-memory audit log implementing the core audit seam.
//! Logging is fire-and-forget: it never blocks or fails the operation
//! that emitted the event. Every entry is also mirrored to the tracing
//! stream under the `audit` target for external aggregation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use vigil_core::AuditSink;

/// Default retention for the in-memory log.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// One audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub metadata: serde_json::Value,
}

/// Bounded in-memory audit log. Oldest entries are dropped at capacity.
pub struct AuditLog {
    entries: Arc<RwLock<VecDeque<AuditLogEntry>>>,
    max_entries: usize,
}

impl AuditLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(max_entries))),
            max_entries,
        }
    }

    /// All retained entries, oldest first.
    pub async fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// Entries for one resource, oldest first.
    pub async fn entries_for(&self, resource_id: &str) -> Vec<AuditLogEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.resource_id == resource_id)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

#[async_trait]
impl AuditSink for AuditLog {
    async fn log_event(
        &self,
        event_type: &str,
        action: &str,
        resource_type: &str,
        resource_id: &str,
        metadata: serde_json::Value,
    ) {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            action: action.to_string(),
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            metadata,
        };

        tracing::info!(
            target: "audit",
            event_type = %entry.event_type,
            action = %entry.action,
            resource_type = %entry.resource_type,
            resource_id = %entry.resource_id,
            "audit event"
        );

        let mut entries = self.entries.write().await;
        if entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn records_and_filters_entries() {
        let log = AuditLog::new(10);
        log.log_event("incident", "created", "incident", "INC-1", json!({}))
            .await;
        log.log_event("incident", "escalated", "incident", "INC-2", json!({}))
            .await;

        assert_eq!(log.len().await, 2);
        let for_one = log.entries_for("INC-1").await;
        assert_eq!(for_one.len(), 1);
        assert_eq!(for_one[0].action, "created");
    }

    #[tokio::test]
    async fn capacity_drops_oldest() {
        let log = AuditLog::new(3);
        for i in 0..5 {
            log.log_event("incident", "created", "incident", &format!("INC-{}", i), json!({}))
                .await;
        }
        let entries = log.entries().await;
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].resource_id, "INC-2");
        assert_eq!(entries[2].resource_id, "INC-4");
    }
}
