//! End-to-end lifecycle tests against the public crate surface.
//!
//! These wire a registry with the in-memory store and scripted
//! collaborators, then walk incidents through the full lifecycle the way
//! the API layer and background loops would.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use vigil_core::clock::ManualClock;
use vigil_core::detector::{ActivityFeed, AuthFailure, PatternDetector, TransferEvent};
use vigil_core::forensics::{ForensicsCollector, NullTelemetry, TelemetryError};
use vigil_core::recovery::{ChecklistExecutor, RecoveryPlanner};
use vigil_core::staffing::StaticRoster;
use vigil_core::{
    default_actions, ActionOutcome, Aes256GcmEncryptor, Clock, ContainmentDispatcher,
    ContainmentOutcome, ContainmentRepository, DetectionMethod, DetectorConfig, EscalationMonitor,
    EventBus, Findings, ForensicsConfig, Incident, IncidentFilter, IncidentRegistry,
    IncidentState, IncidentType, MemoryStore, NewIncident, NoopAuditSink, Pagination, Severity,
};

/// Dispatcher that runs the default action list for the incident's type,
/// failing the action names listed in `failing`.
struct TableDispatcher {
    failing: Vec<&'static str>,
}

#[async_trait]
impl ContainmentDispatcher for TableDispatcher {
    async fn contain(&self, incident: &Incident, extra_actions: &[String]) -> ContainmentOutcome {
        let mut outcome = ContainmentOutcome::default();
        let mut names: Vec<String> = default_actions(incident.incident_type)
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        for extra in extra_actions {
            if !names.contains(extra) {
                names.push(extra.clone());
            }
        }
        for name in names {
            let entry = ActionOutcome {
                action: name.clone(),
                message: String::new(),
                completed_at: Utc::now(),
            };
            if self.failing.contains(&name.as_str()) {
                outcome.failed.push(ActionOutcome {
                    message: "connector unavailable".to_string(),
                    ..entry
                });
            } else {
                outcome.successful.push(ActionOutcome {
                    message: "ok".to_string(),
                    ..entry
                });
            }
        }
        outcome
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    registry: Arc<IncidentRegistry>,
}

fn harness(failing_actions: Vec<&'static str>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let dyn_clock: Arc<dyn Clock> = Arc::clone(&clock) as Arc<dyn Clock>;
    let registry = Arc::new(IncidentRegistry::new(
        Arc::clone(&store) as Arc<dyn vigil_core::Store>,
        Arc::new(EventBus::default()),
        Arc::clone(&dyn_clock),
        Arc::new(StaticRoster::example()),
        Arc::new(ForensicsCollector::new(
            Arc::new(NullTelemetry),
            Arc::new(Aes256GcmEncryptor::generate()),
            Arc::clone(&dyn_clock),
            ForensicsConfig::default(),
        )),
        Arc::new(TableDispatcher {
            failing: failing_actions,
        }),
        Arc::new(RecoveryPlanner::new(
            Arc::new(ChecklistExecutor),
            Arc::clone(&dyn_clock),
        )),
        Arc::new(NoopAuditSink),
    ));
    Harness {
        store,
        clock,
        registry,
    }
}

fn breach_request(severity: Severity) -> NewIncident {
    NewIncident {
        incident_type: IncidentType::DataBreach,
        severity,
        description: "bulk export of customer records".to_string(),
        source: Some("198.51.100.4".to_string()),
        affected_systems: vec!["crm".to_string()],
        affected_users: vec!["u-1".to_string(), "u-2".to_string()],
        detection_method: DetectionMethod::Manual,
        initial_findings: Findings::None,
    }
}

#[tokio::test]
async fn critical_breach_is_contained_before_creation_returns() {
    let h = harness(Vec::new());
    let incident = h
        .registry
        .create_incident(breach_request(Severity::Critical))
        .await
        .unwrap();

    assert_eq!(incident.state, IncidentState::Contained);
    assert_eq!(
        incident.response_deadline,
        incident.created_at + Duration::minutes(15)
    );

    let outcome = h
        .registry
        .store()
        .get_containment(incident.id)
        .await
        .unwrap()
        .unwrap();
    assert!(outcome.is_complete());
    // Default actions for a data breach ran.
    let names: Vec<&str> = outcome.successful.iter().map(|a| a.action.as_str()).collect();
    assert!(names.contains(&"terminate_sessions"));
    assert!(names.contains(&"backup_evidence"));
}

#[tokio::test]
async fn partial_containment_failure_leaves_state_and_persists_result() {
    let h = harness(vec!["reset_credentials"]);
    let incident = h
        .registry
        .create_incident(breach_request(Severity::Critical))
        .await
        .unwrap();

    // One default action failed, so the incident stayed in Detected.
    assert_eq!(incident.state, IncidentState::Detected);
    let outcome = h
        .registry
        .store()
        .get_containment(incident.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].action, "reset_credentials");
    assert!(!outcome.successful.is_empty());
}

#[tokio::test]
async fn full_lifecycle_produces_an_immutable_report() {
    let h = harness(Vec::new());
    let incident = h
        .registry
        .create_incident(breach_request(Severity::High))
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(10));
    let incident = h
        .registry
        .update_state(incident.id, IncidentState::Triaged, None, "analyst")
        .await
        .unwrap();

    let outcome = h.registry.contain(incident.id, &[]).await.unwrap();
    assert!(outcome.is_complete());
    let incident = h.registry.get_incident(incident.id).await.unwrap();
    assert_eq!(incident.state, IncidentState::Contained);

    h.registry
        .update_state(incident.id, IncidentState::Eradicated, None, "analyst")
        .await
        .unwrap();

    let (_, result) = h.registry.recover(incident.id, true).await.unwrap();
    assert!(result.unwrap().success);
    let incident = h.registry.get_incident(incident.id).await.unwrap();
    assert_eq!(incident.state, IncidentState::Recovered);

    h.registry
        .update_state(incident.id, IncidentState::LessonsLearned, None, "commander")
        .await
        .unwrap();
    let incident = h
        .registry
        .update_state(incident.id, IncidentState::Closed, None, "commander")
        .await
        .unwrap();
    assert_eq!(incident.state, IncidentState::Closed);

    // Report was generated on lessons-learned entry.
    let report = h.registry.generate_report(incident.id).await.unwrap();
    assert_eq!(report.incident_id, incident.id);
    assert!(report.compliance.sla_met);
    assert!(report.compliance.external_notification_required);
    assert!(report.containment.is_some());
    assert!(report.recovery.is_some());
    assert_eq!(report.forensics.len(), 1);

    // A second request returns the same artifact.
    let again = h.registry.generate_report(incident.id).await.unwrap();
    assert_eq!(again.id, report.id);

    // History is append-only and strictly ordered.
    for pair in incident.state_history.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
    assert_eq!(
        incident.state_history.last().unwrap().to,
        IncidentState::Closed
    );
}

#[tokio::test]
async fn escalation_fires_once_across_monitor_runs() {
    let h = harness(Vec::new());
    let monitor = EscalationMonitor::new(
        Arc::clone(&h.registry),
        Arc::clone(&h.clock) as Arc<dyn Clock>,
    );

    let incident = h
        .registry
        .create_incident(breach_request(Severity::High))
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(90));
    assert_eq!(monitor.tick().await.unwrap(), vec![incident.id]);
    assert!(monitor.tick().await.unwrap().is_empty());

    let reloaded = h.registry.get_incident(incident.id).await.unwrap();
    assert_eq!(reloaded.state, IncidentState::Detected);
    assert!(reloaded.escalated_at.is_some());
}

#[tokio::test]
async fn listing_filters_and_paginates_newest_first() {
    let h = harness(Vec::new());
    for i in 0..5 {
        h.clock.advance(Duration::minutes(1));
        let mut request = breach_request(Severity::Low);
        request.description = format!("incident {}", i);
        if i % 2 == 0 {
            request.incident_type = IncidentType::Malware;
        }
        h.registry.create_incident(request).await.unwrap();
    }

    let (all, total) = h
        .registry
        .list_incidents(&IncidentFilter::default(), &Pagination::default())
        .await
        .unwrap();
    assert_eq!(total, 5);
    for pair in all.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }

    let malware_filter = IncidentFilter {
        incident_type: Some(vec![IncidentType::Malware]),
        ..IncidentFilter::default()
    };
    let (_, malware_total) = h
        .registry
        .list_incidents(&malware_filter, &Pagination::default())
        .await
        .unwrap();
    assert_eq!(malware_total, 3);

    let page = Pagination {
        page: 2,
        per_page: 2,
    };
    let (second_page, _) = h
        .registry
        .list_incidents(&IncidentFilter::default(), &page)
        .await
        .unwrap();
    assert_eq!(second_page.len(), 2);
    assert_eq!(second_page[0].created_at, all[2].created_at);
}

#[tokio::test]
async fn statistics_reflect_store_contents() {
    let h = harness(Vec::new());
    h.registry
        .create_incident(breach_request(Severity::High))
        .await
        .unwrap();
    let mut low = breach_request(Severity::Low);
    low.incident_type = IncidentType::Malware;
    h.registry.create_incident(low).await.unwrap();

    let stats = h.registry.statistics().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.open, 2);
    assert_eq!(stats.by_severity.get("high"), Some(&1));
    assert_eq!(stats.by_type.get("malware"), Some(&1));
    assert_eq!(stats.operations.incidents_created, 2);
}

/// Feed that keeps reporting one noisy user.
struct NoisyFeed;

#[async_trait]
impl ActivityFeed for NoisyFeed {
    async fn download_events_since(
        &self,
        _since: chrono::DateTime<Utc>,
    ) -> Result<Vec<TransferEvent>, TelemetryError> {
        Ok((0..51)
            .map(|i| TransferEvent {
                user: "u-exfil".to_string(),
                resource: format!("export/{}", i),
                bytes: 4096,
                timestamp: Utc::now(),
            })
            .collect())
    }

    async fn failed_logins_since(
        &self,
        _since: chrono::DateTime<Utc>,
    ) -> Result<Vec<AuthFailure>, TelemetryError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn detector_is_idempotent_until_incident_closes() {
    let h = harness(Vec::new());
    let feed = Arc::new(NoisyFeed);
    let detector = PatternDetector::new(
        Arc::clone(&h.registry),
        Arc::clone(&feed) as Arc<dyn ActivityFeed>,
        Arc::clone(&h.clock) as Arc<dyn Clock>,
        DetectorConfig::default(),
    );

    let created = detector.tick().await;
    assert_eq!(created.len(), 1);
    let incident = h.registry.get_incident(created[0]).await.unwrap();
    assert_eq!(incident.incident_type, IncidentType::DataBreach);
    assert_eq!(incident.severity, Severity::High);

    // Same pattern while the incident is open: nothing new.
    assert!(detector.tick().await.is_empty());

    // Walk the incident to Closed, then the same pattern may fire again.
    for state in [
        IncidentState::Triaged,
        IncidentState::Contained,
        IncidentState::Eradicated,
        IncidentState::Recovered,
        IncidentState::LessonsLearned,
        IncidentState::Closed,
    ] {
        h.registry
            .update_state(incident.id, state, None, "analyst")
            .await
            .unwrap();
    }
    assert_eq!(detector.tick().await.len(), 1);
}

#[tokio::test]
async fn aborted_creation_leaves_no_partial_state() {
    let h = harness(Vec::new());
    h.store.fail_next_create();
    assert!(h
        .registry
        .create_incident(breach_request(Severity::High))
        .await
        .is_err());

    let stats = h.registry.statistics().await.unwrap();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.operations.incidents_created, 0);
}
