//! Automated pattern detection.
//!
//! The detector evaluates two canonical patterns on every tick, each
//! independently parameterized from [`DetectorConfig`]: bulk exfiltration
//! (per-user download volume over a trailing window) and brute force
//! (per-source failed authentications over a trailing window). It also
//! ingests alerts from an external security monitor through a fixed kind
//! lookup. Checks are isolated: an error in one never blocks the other, and
//! a failing tick never stalls the next one.
//!
//! Dedup is keyed on the incident `source` field: a pattern hit is skipped
//! while an open incident with the same source tag exists.

use crate::clock::Clock;
use crate::config::DetectorConfig;
use crate::forensics::TelemetryError;
use crate::incident::{DetectionMethod, Findings, Incident, IncidentType, Severity};
use crate::registry::{IncidentRegistry, NewIncident, RegistryError};
use crate::store::IncidentFilter;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// One download/export event observed in the activity feed.
#[derive(Debug, Clone)]
pub struct TransferEvent {
    pub user: String,
    pub resource: String,
    pub bytes: u64,
    pub timestamp: DateTime<Utc>,
}

/// One failed authentication observed in the activity feed.
#[derive(Debug, Clone)]
pub struct AuthFailure {
    pub source_addr: String,
    pub user: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Activity feed the pattern checks read from.
#[async_trait]
pub trait ActivityFeed: Send + Sync {
    /// Download/export events since `since`.
    async fn download_events_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<TransferEvent>, TelemetryError>;

    /// Failed authentications since `since`.
    async fn failed_logins_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<AuthFailure>, TelemetryError>;
}

/// An alert pushed by the external security monitor.
#[derive(Debug, Clone)]
pub struct SecurityAlert {
    /// Monitor-side alert kind, matched against the lookup table.
    pub alert_kind: String,
    /// Monitor-side alert identifier.
    pub alert_id: String,
    pub description: String,
    pub source: Option<String>,
    pub affected_systems: Vec<String>,
    pub affected_users: Vec<String>,
    /// Critical alerts always spawn an incident at critical severity.
    pub critical: bool,
}

/// Alert kinds that spawn an incident even without the critical flag.
const ALWAYS_ESCALATE: &[&str] = &["data_exfiltration", "ransomware", "system_compromise"];

/// Fixed alert-kind lookup. Unknown kinds map to a medium system
/// compromise so nothing the monitor flags gets silently dropped.
fn map_alert_kind(kind: &str) -> (IncidentType, Severity) {
    match kind {
        "malware" => (IncidentType::Malware, Severity::High),
        "ransomware" => (IncidentType::Malware, Severity::Critical),
        "intrusion" => (IncidentType::UnauthorizedAccess, Severity::High),
        "data_exfiltration" => (IncidentType::DataBreach, Severity::Critical),
        "ddos" => (IncidentType::DenialOfService, Severity::High),
        "insider_threat" => (IncidentType::InsiderThreat, Severity::High),
        "data_loss" => (IncidentType::DataLoss, Severity::High),
        "system_compromise" => (IncidentType::SystemCompromise, Severity::Critical),
        "policy_violation" => (IncidentType::PolicyViolation, Severity::Low),
        _ => (IncidentType::SystemCompromise, Severity::Medium),
    }
}

/// Per-user aggregate for the exfiltration check.
#[derive(Debug, Default)]
struct TransferAggregate {
    event_count: u64,
    total_bytes: u64,
}

/// The pattern detector.
pub struct PatternDetector {
    registry: Arc<IncidentRegistry>,
    feed: Arc<dyn ActivityFeed>,
    clock: Arc<dyn Clock>,
    config: DetectorConfig,
}

impl PatternDetector {
    pub fn new(
        registry: Arc<IncidentRegistry>,
        feed: Arc<dyn ActivityFeed>,
        clock: Arc<dyn Clock>,
        config: DetectorConfig,
    ) -> Self {
        Self {
            registry,
            feed,
            clock,
            config,
        }
    }

    /// Evaluates all pattern checks once. Check errors are isolated and
    /// logged; the returned ids are the incidents created this tick.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Vec<Uuid> {
        let mut created = Vec::new();

        match self.check_exfiltration().await {
            Ok(mut ids) => created.append(&mut ids),
            Err(e) => warn!(error = %e, "exfiltration check failed"),
        }
        match self.check_brute_force().await {
            Ok(mut ids) => created.append(&mut ids),
            Err(e) => warn!(error = %e, "brute-force check failed"),
        }

        if !created.is_empty() {
            counter!("vigil_detector_incidents_total").increment(created.len() as u64);
        }
        created
    }

    /// Whether an open incident already carries this source tag.
    async fn open_incident_exists(&self, source_tag: &str) -> Result<bool, RegistryError> {
        let filter = IncidentFilter {
            source: Some(source_tag.to_string()),
            open_only: true,
            ..IncidentFilter::default()
        };
        let (_, total) = self
            .registry
            .list_incidents(&filter, &Default::default())
            .await?;
        Ok(total > 0)
    }

    /// Per-user download volume over the trailing window. Exceeding either
    /// the event-count or the byte threshold spawns one high-severity data
    /// breach per offending user.
    async fn check_exfiltration(&self) -> Result<Vec<Uuid>, DetectorError> {
        let now = self.clock.now();
        let since = now - Duration::minutes(self.config.exfil_window_minutes);
        let events = self.feed.download_events_since(since).await?;

        let mut per_user: HashMap<String, TransferAggregate> = HashMap::new();
        for event in &events {
            let aggregate = per_user.entry(event.user.clone()).or_default();
            aggregate.event_count += 1;
            aggregate.total_bytes += event.bytes;
        }

        let mut created = Vec::new();
        for (user, aggregate) in per_user {
            if aggregate.event_count < self.config.exfil_event_threshold
                && aggregate.total_bytes < self.config.exfil_byte_threshold
            {
                continue;
            }
            let source_tag = format!("detector:exfiltration:{}", user);
            if self.open_incident_exists(&source_tag).await? {
                debug!(user = %user, "exfiltration pattern already has an open incident");
                continue;
            }

            info!(
                user = %user,
                events = aggregate.event_count,
                bytes = aggregate.total_bytes,
                "exfiltration pattern tripped"
            );
            let incident = self
                .registry
                .create_incident(NewIncident {
                    incident_type: IncidentType::DataBreach,
                    severity: Severity::High,
                    description: format!(
                        "possible data exfiltration: {} download events, {} bytes by {} within {} minutes",
                        aggregate.event_count,
                        aggregate.total_bytes,
                        user,
                        self.config.exfil_window_minutes
                    ),
                    source: Some(source_tag),
                    affected_systems: Vec::new(),
                    affected_users: vec![user.clone()],
                    detection_method: DetectionMethod::PatternAnalysis,
                    initial_findings: Findings::Exfiltration {
                        user,
                        event_count: aggregate.event_count,
                        total_bytes: aggregate.total_bytes,
                        window_minutes: self.config.exfil_window_minutes,
                    },
                })
                .await?;
            created.push(incident.id);
        }
        Ok(created)
    }

    /// Per-source failed authentications over the trailing window. Exceeding
    /// the threshold spawns one medium-severity unauthorized-access incident
    /// per offending source address.
    async fn check_brute_force(&self) -> Result<Vec<Uuid>, DetectorError> {
        let now = self.clock.now();
        let since = now - Duration::minutes(self.config.brute_force_window_minutes);
        let failures = self.feed.failed_logins_since(since).await?;

        let mut per_source: HashMap<String, u64> = HashMap::new();
        for failure in &failures {
            *per_source.entry(failure.source_addr.clone()).or_default() += 1;
        }

        let mut created = Vec::new();
        for (source_addr, failure_count) in per_source {
            if failure_count < self.config.brute_force_threshold {
                continue;
            }
            if self.open_incident_exists(&source_addr).await? {
                debug!(source = %source_addr, "brute-force pattern already has an open incident");
                continue;
            }

            info!(
                source = %source_addr,
                failures = failure_count,
                "brute-force pattern tripped"
            );
            let incident = self
                .registry
                .create_incident(NewIncident {
                    incident_type: IncidentType::UnauthorizedAccess,
                    severity: Severity::Medium,
                    description: format!(
                        "possible brute force: {} failed authentications from {} within {} minutes",
                        failure_count, source_addr, self.config.brute_force_window_minutes
                    ),
                    source: Some(source_addr.clone()),
                    affected_systems: Vec::new(),
                    affected_users: Vec::new(),
                    detection_method: DetectionMethod::PatternAnalysis,
                    initial_findings: Findings::BruteForce {
                        source_addr,
                        failure_count,
                        window_minutes: self.config.brute_force_window_minutes,
                    },
                })
                .await?;
            created.push(incident.id);
        }
        Ok(created)
    }

    /// Ingests one alert from the external security monitor. Only critical
    /// alerts and kinds in the always-escalate set spawn an incident; the
    /// rest are logged and dropped.
    #[instrument(skip(self, alert), fields(alert_kind = %alert.alert_kind, alert_id = %alert.alert_id))]
    pub async fn ingest_alert(
        &self,
        alert: SecurityAlert,
    ) -> Result<Option<Incident>, RegistryError> {
        if !alert.critical && !ALWAYS_ESCALATE.contains(&alert.alert_kind.as_str()) {
            debug!("alert below incident threshold, dropped");
            return Ok(None);
        }

        let (incident_type, mapped_severity) = map_alert_kind(&alert.alert_kind);
        let severity = if alert.critical {
            Severity::Critical
        } else {
            mapped_severity
        };

        let incident = self
            .registry
            .create_incident(NewIncident {
                incident_type,
                severity,
                description: format!("[{}] {}", alert.alert_kind, alert.description),
                source: alert.source,
                affected_systems: alert.affected_systems,
                affected_users: alert.affected_users,
                detection_method: DetectionMethod::Automated,
                initial_findings: Findings::ExternalAlert {
                    alert_kind: alert.alert_kind,
                    alert_id: alert.alert_id,
                    critical: alert.critical,
                },
            })
            .await?;
        counter!("vigil_detector_incidents_total").increment(1);
        Ok(Some(incident))
    }
}

/// Internal error used inside a single pattern check.
#[derive(Debug, thiserror::Error)]
enum DetectorError {
    #[error(transparent)]
    Feed(#[from] TelemetryError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Activity feed with no activity.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuietFeed;

#[async_trait]
impl ActivityFeed for QuietFeed {
    async fn download_events_since(
        &self,
        _since: DateTime<Utc>,
    ) -> Result<Vec<TransferEvent>, TelemetryError> {
        Ok(Vec::new())
    }

    async fn failed_logins_since(
        &self,
        _since: DateTime<Utc>,
    ) -> Result<Vec<AuthFailure>, TelemetryError> {
        Ok(Vec::new())
    }
}
