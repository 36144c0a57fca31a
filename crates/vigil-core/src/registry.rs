//! The incident registry: single owner of incident lifecycle state.
//!
//! The registry is constructed once at process startup with injected
//! collaborators (store, event bus, clock, staffing, telemetry, dispatcher,
//! step executor, audit sink) and exposes the mutating operations. All
//! mutations of one incident are serialized through a per-incident lock on
//! top of the store's optimistic version check, so no two writers can
//! interleave a read-modify-write.
//!
//! Audit logging is fire-and-forget and never affects the outcome of an
//! operation.

use crate::audit::AuditSink;
use crate::clock::Clock;
use crate::containment::{ContainmentDispatcher, ContainmentOutcome};
use crate::events::{containment_event, EventBus, IncidentEvent};
use crate::forensics::{ForensicsCollector, ForensicsError, ForensicsRecord};
use crate::incident::{
    DetectionMethod, Findings, Incident, IncidentState, IncidentType, Severity,
};
use crate::lifecycle::{self, LifecycleError};
use crate::recovery::{RecoveryExecutionResult, RecoveryPlan, RecoveryPlanner};
use crate::report::{assemble_report, IncidentReport};
use crate::staffing::{StaffingDirectory, StaffingError};
use crate::store::{
    ContainmentRepository, ForensicsRepository, IncidentFilter, IncidentRepository, Pagination,
    RecoveryRepository, ReportRepository, Store, StoreError,
};
use metrics::counter;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Errors surfaced by registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("incident not found: {0}")]
    NotFound(Uuid),

    #[error("recovery plan not found: {0}")]
    PlanNotFound(Uuid),

    #[error(transparent)]
    InvalidTransition(#[from] LifecycleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Staffing(#[from] StaffingError),

    #[error(transparent)]
    Forensics(#[from] ForensicsError),
}

/// Request to create an incident.
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub incident_type: IncidentType,
    pub severity: Severity,
    pub description: String,
    pub source: Option<String>,
    pub affected_systems: Vec<String>,
    pub affected_users: Vec<String>,
    pub detection_method: DetectionMethod,
    pub initial_findings: Findings,
}

/// Operation counters for the statistics surface.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RegistryStats {
    pub incidents_created: u64,
    pub transitions_applied: u64,
    pub transitions_rejected: u64,
    pub escalations: u64,
    pub containment_runs: u64,
    pub containment_partial_failures: u64,
    pub recoveries_executed: u64,
    pub reports_generated: u64,
}

/// Aggregate counts for the statistics surface.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IncidentStatistics {
    pub total: u64,
    pub open: u64,
    pub by_state: BTreeMap<String, u64>,
    pub by_severity: BTreeMap<String, u64>,
    pub by_type: BTreeMap<String, u64>,
    pub operations: RegistryStats,
}

/// The registry itself.
pub struct IncidentRegistry {
    store: Arc<dyn Store>,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    staffing: Arc<dyn StaffingDirectory>,
    forensics: Arc<ForensicsCollector>,
    dispatcher: Arc<dyn ContainmentDispatcher>,
    recovery: Arc<RecoveryPlanner>,
    audit: Arc<dyn AuditSink>,
    /// Per-incident serialization locks.
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    stats: RwLock<RegistryStats>,
}

impl IncidentRegistry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        events: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        staffing: Arc<dyn StaffingDirectory>,
        forensics: Arc<ForensicsCollector>,
        dispatcher: Arc<dyn ContainmentDispatcher>,
        recovery: Arc<RecoveryPlanner>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            events,
            clock,
            staffing,
            forensics,
            dispatcher,
            recovery,
            audit,
            locks: Mutex::new(HashMap::new()),
            stats: RwLock::new(RegistryStats::default()),
        }
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    pub async fn stats(&self) -> RegistryStats {
        self.stats.read().await.clone()
    }

    async fn lock_for(&self, id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id).or_default().clone()
    }

    async fn load(&self, id: Uuid) -> Result<Incident, RegistryError> {
        self.store
            .get_incident(id)
            .await?
            .ok_or(RegistryError::NotFound(id))
    }

    /// Creates an incident: validates, computes the deadline, assigns
    /// responders, takes the initial forensics snapshot, and persists the
    /// whole set as one unit of work. For critical severity, containment
    /// runs synchronously before this returns.
    #[instrument(skip(self, request), fields(incident_type = %request.incident_type, severity = %request.severity))]
    pub async fn create_incident(
        &self,
        request: NewIncident,
    ) -> Result<Incident, RegistryError> {
        if request.description.trim().is_empty() {
            return Err(RegistryError::Validation(
                "description must not be empty".to_string(),
            ));
        }

        let now = self.clock.now();
        let mut incident = Incident::new(
            request.incident_type,
            request.severity,
            request.description,
            request.source,
            request.affected_systems,
            request.affected_users,
            request.detection_method,
            request.initial_findings,
            now,
        );
        incident.responders = self
            .staffing
            .assign(request.incident_type, request.severity, now)
            .await?;

        let snapshot = self.forensics.collect(&incident).await?;

        // All-or-nothing: the incident, its snapshot, and its responder set
        // commit together or not at all.
        self.store.create_incident(&incident, &snapshot).await?;

        self.stats.write().await.incidents_created += 1;
        counter!("vigil_incidents_created_total").increment(1);

        self.audit
            .log_event(
                "incident",
                "created",
                "incident",
                &incident.incident_id,
                json!({
                    "type": incident.incident_type,
                    "severity": incident.severity,
                    "deadline": incident.response_deadline,
                }),
            )
            .await;

        self.events.publish(IncidentEvent::Created {
            incident_id: incident.id,
            public_id: incident.incident_id.clone(),
            incident_type: incident.incident_type,
            severity: incident.severity,
        });

        info!(
            incident_id = %incident.incident_id,
            deadline = %incident.response_deadline,
            "incident created"
        );

        if incident.severity == Severity::Critical {
            debug!(incident_id = %incident.incident_id, "critical severity, containing immediately");
            self.contain(incident.id, &[]).await?;
            return self.load(incident.id).await;
        }

        Ok(incident)
    }

    /// Applies a lifecycle transition. Fails with `NotFound` for unknown
    /// incidents and `InvalidTransition` for edges not in the table; on
    /// success appends to the history and runs state-entry side effects.
    #[instrument(skip(self, notes), fields(incident_id = %id, to = %new_state))]
    pub async fn update_state(
        &self,
        id: Uuid,
        new_state: IncidentState,
        notes: Option<String>,
        actor: &str,
    ) -> Result<Incident, RegistryError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let mut incident = self.load(id).await?;
        let from = incident.state;
        if let Err(e) =
            lifecycle::apply_transition(&mut incident, new_state, actor, notes, self.clock.now())
        {
            self.stats.write().await.transitions_rejected += 1;
            return Err(e.into());
        }
        incident.version += 1;
        self.store.save_incident(&incident).await?;

        self.stats.write().await.transitions_applied += 1;
        counter!("vigil_state_transitions_total").increment(1);

        self.audit
            .log_event(
                "incident",
                "state_changed",
                "incident",
                &incident.incident_id,
                json!({ "from": from, "to": new_state, "actor": actor }),
            )
            .await;

        self.events.publish(IncidentEvent::StateChanged {
            incident_id: id,
            from,
            to: new_state,
            actor: actor.to_string(),
        });

        // State-entry side effects.
        if new_state == IncidentState::LessonsLearned {
            if let Err(e) = self.generate_report(id).await {
                warn!(incident_id = %incident.incident_id, error = %e, "report generation failed on lessons-learned entry");
            }
        }

        self.load(id).await
    }

    /// Records a deadline escalation without changing state. Idempotent:
    /// an incident escalates at most once.
    #[instrument(skip(self, reason), fields(incident_id = %id))]
    pub async fn escalate(&self, id: Uuid, reason: &str) -> Result<(), RegistryError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let mut incident = self.load(id).await?;
        if incident.escalated_at.is_some() {
            debug!(incident_id = %incident.incident_id, "already escalated, skipping");
            return Ok(());
        }

        let now = self.clock.now();
        incident.escalated_at = Some(now);
        incident.last_updated = now;
        incident.version += 1;
        self.store.save_incident(&incident).await?;

        self.stats.write().await.escalations += 1;
        counter!("vigil_escalations_total").increment(1);

        self.audit
            .log_event(
                "incident",
                "escalated",
                "incident",
                &incident.incident_id,
                json!({ "reason": reason, "deadline": incident.response_deadline }),
            )
            .await;

        self.events.publish(IncidentEvent::Escalated {
            incident_id: id,
            reason: reason.to_string(),
            deadline: incident.response_deadline,
        });

        warn!(
            incident_id = %incident.incident_id,
            deadline = %incident.response_deadline,
            reason,
            "incident escalated"
        );
        Ok(())
    }

    /// Runs containment. Actions execute independently; the incident only
    /// auto-advances to `Contained` when every action succeeded. On partial
    /// failure the incident stays in its prior state and the outcome is
    /// persisted for operator follow-up.
    #[instrument(skip(self, extra_actions), fields(incident_id = %id))]
    pub async fn contain(
        &self,
        id: Uuid,
        extra_actions: &[String],
    ) -> Result<ContainmentOutcome, RegistryError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let mut incident = self.load(id).await?;
        let outcome = self.dispatcher.contain(&incident, extra_actions).await;
        self.store.save_containment(id, &outcome).await?;

        {
            let mut stats = self.stats.write().await;
            stats.containment_runs += 1;
            if !outcome.is_complete() {
                stats.containment_partial_failures += 1;
            }
        }
        counter!("vigil_containment_runs_total").increment(1);

        self.events.publish(containment_event(id, &outcome));

        if outcome.is_complete() {
            if lifecycle::is_valid_transition(incident.state, IncidentState::Contained) {
                let from = incident.state;
                lifecycle::apply_transition(
                    &mut incident,
                    IncidentState::Contained,
                    "system",
                    Some("all containment actions succeeded".to_string()),
                    self.clock.now(),
                )?;
                incident.version += 1;
                self.store.save_incident(&incident).await?;
                self.stats.write().await.transitions_applied += 1;
                self.events.publish(IncidentEvent::StateChanged {
                    incident_id: id,
                    from,
                    to: IncidentState::Contained,
                    actor: "system".to_string(),
                });
            } else {
                debug!(
                    incident_id = %incident.incident_id,
                    state = %incident.state,
                    "containment complete but state does not advance from here"
                );
            }
        } else {
            warn!(
                incident_id = %incident.incident_id,
                failed = outcome.failed.len(),
                "partial containment failure, incident not advanced"
            );
        }

        self.audit
            .log_event(
                "incident",
                "containment",
                "incident",
                &incident.incident_id,
                json!({
                    "successful": outcome.successful.len(),
                    "failed": outcome.failed.len(),
                }),
            )
            .await;

        Ok(outcome)
    }

    /// Takes an additional evidence snapshot on demand.
    #[instrument(skip(self), fields(incident_id = %id))]
    pub async fn collect_forensics(&self, id: Uuid) -> Result<ForensicsRecord, RegistryError> {
        let incident = self.load(id).await?;
        let record = self.forensics.collect(&incident).await?;
        self.store.add_forensics(&record).await?;

        self.audit
            .log_event(
                "incident",
                "forensics_collected",
                "forensics",
                &record.id.to_string(),
                json!({
                    "incident": incident.incident_id,
                    "integrity_hash": record.integrity_hash,
                }),
            )
            .await;

        Ok(record)
    }

    /// Generates a recovery plan for the incident and optionally executes
    /// it. The generated plan becomes the incident's active plan.
    #[instrument(skip(self), fields(incident_id = %id))]
    pub async fn recover(
        &self,
        id: Uuid,
        execute: bool,
    ) -> Result<(RecoveryPlan, Option<RecoveryExecutionResult>), RegistryError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let incident = self.load(id).await?;
        let plan = self.recovery.generate_plan(&incident);
        self.store.save_recovery_plan(&plan).await?;

        if !execute {
            return Ok((plan, None));
        }
        let result = self.run_plan_locked(incident, &plan).await?;
        Ok((plan, Some(result)))
    }

    /// Executes a previously generated plan by id.
    #[instrument(skip(self), fields(incident_id = %id, plan_id = %plan_id))]
    pub async fn execute_plan(
        &self,
        id: Uuid,
        plan_id: Uuid,
    ) -> Result<RecoveryExecutionResult, RegistryError> {
        let lock = self.lock_for(id).await;
        let _guard = lock.lock().await;

        let incident = self.load(id).await?;
        let plan = self
            .store
            .get_recovery_plan(plan_id)
            .await?
            .filter(|p| p.incident_id == id)
            .ok_or(RegistryError::PlanNotFound(plan_id))?;
        self.run_plan_locked(incident, &plan).await
    }

    /// Runs a plan with the incident lock already held. Stops at the first
    /// failing step; on full success the incident auto-advances to
    /// `Recovered`.
    async fn run_plan_locked(
        &self,
        mut incident: Incident,
        plan: &RecoveryPlan,
    ) -> Result<RecoveryExecutionResult, RegistryError> {
        let result = self.recovery.execute_plan(&incident, plan).await;
        self.store.save_recovery_result(&result).await?;

        self.stats.write().await.recoveries_executed += 1;
        counter!("vigil_recovery_executions_total").increment(1);

        self.events.publish(IncidentEvent::RecoveryFinished {
            incident_id: incident.id,
            success: result.success,
        });

        if result.success {
            if lifecycle::is_valid_transition(incident.state, IncidentState::Recovered) {
                let from = incident.state;
                lifecycle::apply_transition(
                    &mut incident,
                    IncidentState::Recovered,
                    "system",
                    Some("recovery plan completed".to_string()),
                    self.clock.now(),
                )?;
                incident.version += 1;
                self.store.save_incident(&incident).await?;
                self.stats.write().await.transitions_applied += 1;
                self.events.publish(IncidentEvent::StateChanged {
                    incident_id: incident.id,
                    from,
                    to: IncidentState::Recovered,
                    actor: "system".to_string(),
                });
            } else {
                debug!(
                    incident_id = %incident.incident_id,
                    state = %incident.state,
                    "recovery succeeded but state does not advance from here"
                );
            }
        }

        self.audit
            .log_event(
                "incident",
                "recovery_executed",
                "recovery_plan",
                &plan.id.to_string(),
                json!({
                    "incident": incident.incident_id,
                    "success": result.success,
                    "failed_step": result.failed_step,
                }),
            )
            .await;

        Ok(result)
    }

    /// Generates (or returns the already generated) final report.
    #[instrument(skip(self), fields(incident_id = %id))]
    pub async fn generate_report(&self, id: Uuid) -> Result<IncidentReport, RegistryError> {
        if let Some(existing) = self.store.get_report(id).await? {
            return Ok(existing);
        }

        let incident = self.load(id).await?;
        let forensics = self.store.list_forensics(id).await?;
        let containment = self.store.get_containment(id).await?;
        let recovery = self.store.get_recovery_result(id).await?;

        let report = assemble_report(
            &incident,
            &forensics,
            containment,
            recovery,
            self.clock.now(),
        );

        match self.store.save_report(&report).await {
            Ok(()) => {}
            // Lost a race with a concurrent generator; theirs wins.
            Err(StoreError::ReportExists(_)) => {
                if let Some(existing) = self.store.get_report(id).await? {
                    return Ok(existing);
                }
            }
            Err(e) => return Err(e.into()),
        }

        self.stats.write().await.reports_generated += 1;
        self.events.publish(IncidentEvent::ReportGenerated {
            incident_id: id,
            report_id: report.id,
        });

        info!(incident_id = %incident.incident_id, report_id = %report.id, "report generated");
        Ok(report)
    }

    // Read surface.

    pub async fn get_incident(&self, id: Uuid) -> Result<Incident, RegistryError> {
        self.load(id).await
    }

    pub async fn list_incidents(
        &self,
        filter: &IncidentFilter,
        pagination: &Pagination,
    ) -> Result<(Vec<Incident>, u64), RegistryError> {
        let incidents = self.store.list_incidents(filter, pagination).await?;
        let total = self.store.count_incidents(filter).await?;
        Ok((incidents, total))
    }

    pub async fn list_forensics(&self, id: Uuid) -> Result<Vec<ForensicsRecord>, RegistryError> {
        self.load(id).await?;
        Ok(self.store.list_forensics(id).await?)
    }

    /// Aggregate counts across all incidents plus the operation counters.
    pub async fn statistics(&self) -> Result<IncidentStatistics, RegistryError> {
        let total = self.store.count_incidents(&IncidentFilter::default()).await?;
        let open = self
            .store
            .count_incidents(&IncidentFilter {
                open_only: true,
                ..IncidentFilter::default()
            })
            .await?;

        let mut by_state = BTreeMap::new();
        for state in [
            IncidentState::Detected,
            IncidentState::Triaged,
            IncidentState::Contained,
            IncidentState::Eradicated,
            IncidentState::Recovered,
            IncidentState::LessonsLearned,
            IncidentState::Closed,
        ] {
            let count = self
                .store
                .count_incidents(&IncidentFilter {
                    state: Some(vec![state]),
                    ..IncidentFilter::default()
                })
                .await?;
            by_state.insert(state.as_str().to_string(), count);
        }

        let mut by_severity = BTreeMap::new();
        for severity in [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
        ] {
            let count = self
                .store
                .count_incidents(&IncidentFilter {
                    severity: Some(vec![severity]),
                    ..IncidentFilter::default()
                })
                .await?;
            by_severity.insert(severity.as_str().to_string(), count);
        }

        let mut by_type = BTreeMap::new();
        for incident_type in IncidentType::ALL {
            let count = self
                .store
                .count_incidents(&IncidentFilter {
                    incident_type: Some(vec![incident_type]),
                    ..IncidentFilter::default()
                })
                .await?;
            by_type.insert(incident_type.as_str().to_string(), count);
        }

        Ok(IncidentStatistics {
            total,
            open,
            by_state,
            by_severity,
            by_type,
            operations: self.stats().await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::ForensicsConfig;
    use crate::containment::{ActionOutcome, ContainmentDispatcher};
    use crate::crypto::Aes256GcmEncryptor;
    use crate::forensics::NullTelemetry;
    use crate::recovery::ChecklistExecutor;
    use crate::staffing::StaticRoster;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    /// Dispatcher scripted to succeed or fail wholesale.
    struct ScriptedDispatcher {
        fail: bool,
    }

    #[async_trait]
    impl ContainmentDispatcher for ScriptedDispatcher {
        async fn contain(
            &self,
            _incident: &Incident,
            extra_actions: &[String],
        ) -> ContainmentOutcome {
            let mut outcome = ContainmentOutcome::default();
            let entry = ActionOutcome {
                action: "terminate_sessions".to_string(),
                message: "ok".to_string(),
                completed_at: Utc::now(),
            };
            if self.fail {
                outcome.failed.push(ActionOutcome {
                    message: "connector down".to_string(),
                    ..entry
                });
            } else {
                outcome.successful.push(entry);
            }
            for action in extra_actions {
                outcome.successful.push(ActionOutcome {
                    action: action.clone(),
                    message: "ok".to_string(),
                    completed_at: Utc::now(),
                });
            }
            outcome
        }
    }

    fn registry_with(
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        fail_containment: bool,
    ) -> IncidentRegistry {
        let clock: Arc<dyn Clock> = clock;
        IncidentRegistry::new(
            store,
            Arc::new(EventBus::default()),
            Arc::clone(&clock),
            Arc::new(StaticRoster::example()),
            Arc::new(ForensicsCollector::new(
                Arc::new(NullTelemetry),
                Arc::new(Aes256GcmEncryptor::generate()),
                Arc::clone(&clock),
                ForensicsConfig::default(),
            )),
            Arc::new(ScriptedDispatcher {
                fail: fail_containment,
            }),
            Arc::new(RecoveryPlanner::new(
                Arc::new(ChecklistExecutor),
                Arc::clone(&clock),
            )),
            Arc::new(crate::audit::NoopAuditSink),
        )
    }

    fn request(severity: Severity) -> NewIncident {
        NewIncident {
            incident_type: IncidentType::DataBreach,
            severity,
            description: "bulk export anomaly".to_string(),
            source: Some("198.51.100.4".to_string()),
            affected_systems: vec!["crm".to_string()],
            affected_users: vec!["u-1".to_string()],
            detection_method: DetectionMethod::Manual,
            initial_findings: Findings::None,
        }
    }

    #[tokio::test]
    async fn creation_persists_incident_snapshot_and_responders() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = registry_with(Arc::clone(&store), clock, false);

        let incident = registry.create_incident(request(Severity::High)).await.unwrap();
        assert_eq!(incident.state, IncidentState::Detected);
        assert_eq!(incident.responders.len(), 2);
        assert_eq!(
            incident.response_deadline,
            incident.created_at + Duration::minutes(60)
        );
        assert_eq!(store.list_forensics(incident.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_unit_of_work_leaves_no_partial_record() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = registry_with(Arc::clone(&store), clock, false);

        store.fail_next_create();
        let err = registry.create_incident(request(Severity::High)).await;
        assert!(matches!(
            err,
            Err(RegistryError::Store(StoreError::UnitOfWorkAborted(_)))
        ));
        let filter = IncidentFilter::default();
        assert_eq!(store.count_incidents(&filter).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_description_rejected_before_side_effects() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = registry_with(Arc::clone(&store), clock, false);

        let mut req = request(Severity::Low);
        req.description = "   ".to_string();
        assert!(matches!(
            registry.create_incident(req).await,
            Err(RegistryError::Validation(_))
        ));
        assert_eq!(
            store.count_incidents(&IncidentFilter::default()).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn critical_creation_contains_synchronously() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = registry_with(Arc::clone(&store), clock, false);

        let incident = registry
            .create_incident(request(Severity::Critical))
            .await
            .unwrap();
        assert_eq!(incident.state, IncidentState::Contained);
        assert!(store.get_containment(incident.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn critical_creation_with_failing_containment_stays_detected() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = registry_with(Arc::clone(&store), clock, true);

        let incident = registry
            .create_incident(request(Severity::Critical))
            .await
            .unwrap();
        assert_eq!(incident.state, IncidentState::Detected);
        let outcome = store.get_containment(incident.id).await.unwrap().unwrap();
        assert!(!outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn invalid_transition_is_rejected_and_state_unchanged() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = registry_with(Arc::clone(&store), clock, false);

        let incident = registry.create_incident(request(Severity::Medium)).await.unwrap();
        let err = registry
            .update_state(incident.id, IncidentState::Eradicated, None, "analyst")
            .await;
        assert!(matches!(err, Err(RegistryError::InvalidTransition(_))));

        let reloaded = registry.get_incident(incident.id).await.unwrap();
        assert_eq!(reloaded.state, IncidentState::Detected);
        assert_eq!(reloaded.state_history.len(), 1);
    }

    #[tokio::test]
    async fn unknown_incident_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = registry_with(store, clock, false);
        assert!(matches!(
            registry
                .update_state(Uuid::new_v4(), IncidentState::Triaged, None, "analyst")
                .await,
            Err(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn escalation_is_recorded_once_and_leaves_state() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = registry_with(Arc::clone(&store), clock, false);

        let incident = registry.create_incident(request(Severity::High)).await.unwrap();
        registry.escalate(incident.id, "deadline passed").await.unwrap();
        registry.escalate(incident.id, "deadline passed").await.unwrap();

        let reloaded = registry.get_incident(incident.id).await.unwrap();
        assert!(reloaded.escalated_at.is_some());
        assert_eq!(reloaded.state, IncidentState::Detected);
        assert_eq!(registry.stats().await.escalations, 1);
    }

    #[tokio::test]
    async fn lessons_learned_entry_generates_report() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = registry_with(Arc::clone(&store), clock, false);

        let incident = registry.create_incident(request(Severity::Medium)).await.unwrap();
        for state in [
            IncidentState::Triaged,
            IncidentState::Contained,
            IncidentState::Eradicated,
            IncidentState::Recovered,
            IncidentState::LessonsLearned,
        ] {
            registry
                .update_state(incident.id, state, None, "analyst")
                .await
                .unwrap();
        }
        let report = store.get_report(incident.id).await.unwrap().unwrap();
        assert_eq!(report.incident_id, incident.id);
        assert!(!report.recommendations.is_empty());
    }

    #[tokio::test]
    async fn recovery_success_advances_to_recovered() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = registry_with(Arc::clone(&store), clock, false);

        let incident = registry.create_incident(request(Severity::Medium)).await.unwrap();
        for state in [
            IncidentState::Triaged,
            IncidentState::Contained,
            IncidentState::Eradicated,
        ] {
            registry
                .update_state(incident.id, state, None, "analyst")
                .await
                .unwrap();
        }

        let (plan, result) = registry.recover(incident.id, true).await.unwrap();
        let result = result.unwrap();
        assert!(result.success);
        assert_eq!(result.plan_id, plan.id);

        let reloaded = registry.get_incident(incident.id).await.unwrap();
        assert_eq!(reloaded.state, IncidentState::Recovered);
    }

    #[tokio::test]
    async fn plan_without_execute_does_not_move_state() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = registry_with(Arc::clone(&store), clock, false);

        let incident = registry.create_incident(request(Severity::Medium)).await.unwrap();
        let (plan, result) = registry.recover(incident.id, false).await.unwrap();
        assert!(result.is_none());
        assert!(!plan.steps.is_empty());
        let reloaded = registry.get_incident(incident.id).await.unwrap();
        assert_eq!(reloaded.state, IncidentState::Detected);
    }
}
