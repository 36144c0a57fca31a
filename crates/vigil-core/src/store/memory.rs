//! In-memory store.
//!
//! Reference implementation of the persistence collaborator. All maps live
//! behind one `RwLock`, so the create unit-of-work is naturally atomic and
//! the optimistic version check is race-free. Tests can inject a failure
//! into the next unit of work to exercise the all-or-nothing path.

use super::{
    ContainmentRepository, ForensicsRepository, IncidentFilter, IncidentRepository, Pagination,
    RecoveryRepository, ReportRepository, StoreError,
};
use crate::containment::ContainmentOutcome;
use crate::forensics::ForensicsRecord;
use crate::incident::Incident;
use crate::recovery::{RecoveryExecutionResult, RecoveryPlan};
use crate::report::IncidentReport;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    incidents: HashMap<Uuid, Incident>,
    forensics: HashMap<Uuid, Vec<ForensicsRecord>>,
    containment: HashMap<Uuid, ContainmentOutcome>,
    plans: HashMap<Uuid, RecoveryPlan>,
    active_plan: HashMap<Uuid, Uuid>,
    recovery_results: HashMap<Uuid, RecoveryExecutionResult>,
    reports: HashMap<Uuid, IncidentReport>,
}

/// In-memory implementation of the full store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    fail_next_create: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `create_incident` unit of work abort, leaving no
    /// partial record. Test hook.
    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl IncidentRepository for MemoryStore {
    async fn create_incident(
        &self,
        incident: &Incident,
        initial_forensics: &ForensicsRecord,
    ) -> Result<(), StoreError> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(StoreError::UnitOfWorkAborted(
                "injected create failure".to_string(),
            ));
        }
        let mut inner = self.inner.write().await;
        inner.incidents.insert(incident.id, incident.clone());
        inner
            .forensics
            .entry(incident.id)
            .or_default()
            .push(initial_forensics.clone());
        Ok(())
    }

    async fn get_incident(&self, id: Uuid) -> Result<Option<Incident>, StoreError> {
        Ok(self.inner.read().await.incidents.get(&id).cloned())
    }

    async fn list_incidents(
        &self,
        filter: &IncidentFilter,
        pagination: &Pagination,
    ) -> Result<Vec<Incident>, StoreError> {
        let inner = self.inner.read().await;
        let mut matched: Vec<Incident> = inner
            .incidents
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.per_page as usize)
            .collect())
    }

    async fn count_incidents(&self, filter: &IncidentFilter) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.incidents.values().filter(|i| filter.matches(i)).count() as u64)
    }

    async fn save_incident(&self, incident: &Incident) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .incidents
            .get(&incident.id)
            .ok_or(StoreError::NotFound(incident.id))?;
        if stored.version + 1 != incident.version {
            return Err(StoreError::VersionConflict {
                expected: stored.version + 1,
                found: incident.version,
            });
        }
        inner.incidents.insert(incident.id, incident.clone());
        Ok(())
    }
}

#[async_trait]
impl ForensicsRepository for MemoryStore {
    async fn add_forensics(&self, record: &ForensicsRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .forensics
            .entry(record.incident_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn list_forensics(&self, incident_id: Uuid) -> Result<Vec<ForensicsRecord>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .forensics
            .get(&incident_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ContainmentRepository for MemoryStore {
    async fn save_containment(
        &self,
        incident_id: Uuid,
        outcome: &ContainmentOutcome,
    ) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .containment
            .insert(incident_id, outcome.clone());
        Ok(())
    }

    async fn get_containment(
        &self,
        incident_id: Uuid,
    ) -> Result<Option<ContainmentOutcome>, StoreError> {
        Ok(self.inner.read().await.containment.get(&incident_id).cloned())
    }
}

#[async_trait]
impl RecoveryRepository for MemoryStore {
    async fn save_recovery_plan(&self, plan: &RecoveryPlan) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.plans.insert(plan.id, plan.clone());
        inner.active_plan.insert(plan.incident_id, plan.id);
        Ok(())
    }

    async fn get_recovery_plan(&self, plan_id: Uuid) -> Result<Option<RecoveryPlan>, StoreError> {
        Ok(self.inner.read().await.plans.get(&plan_id).cloned())
    }

    async fn active_recovery_plan(
        &self,
        incident_id: Uuid,
    ) -> Result<Option<RecoveryPlan>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .active_plan
            .get(&incident_id)
            .and_then(|plan_id| inner.plans.get(plan_id))
            .cloned())
    }

    async fn save_recovery_result(
        &self,
        result: &RecoveryExecutionResult,
    ) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .recovery_results
            .insert(result.incident_id, result.clone());
        Ok(())
    }

    async fn get_recovery_result(
        &self,
        incident_id: Uuid,
    ) -> Result<Option<RecoveryExecutionResult>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .recovery_results
            .get(&incident_id)
            .cloned())
    }
}

#[async_trait]
impl ReportRepository for MemoryStore {
    async fn save_report(&self, report: &IncidentReport) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.reports.contains_key(&report.incident_id) {
            return Err(StoreError::ReportExists(report.incident_id));
        }
        inner.reports.insert(report.incident_id, report.clone());
        Ok(())
    }

    async fn get_report(&self, incident_id: Uuid) -> Result<Option<IncidentReport>, StoreError> {
        Ok(self.inner.read().await.reports.get(&incident_id).cloned())
    }
}
