//! Recovery planning and execution.
//!
//! Plans are generated from type-keyed step templates with a generic
//! fallback. Execution is strictly ordered and halts at the first failing
//! step; this is the opposite discipline from containment, which runs every
//! action independently and aggregates.

use crate::clock::Clock;
use crate::incident::{Incident, IncidentType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Errors from the step executor collaborator.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("step failed: {0}")]
    Failed(String),

    #[error("step timed out after {0} seconds")]
    Timeout(u64),
}

/// One ordered remediation step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecoveryStep {
    /// 1-based position in the plan.
    pub order: u32,
    /// What to do.
    pub action: String,
    /// Fixed estimate for this step.
    pub estimated_minutes: u32,
}

/// An ordered remediation script for one incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryPlan {
    pub id: Uuid,
    pub incident_id: Uuid,
    pub steps: Vec<RecoveryStep>,
    /// Sum of per-step estimates.
    pub estimated_total_minutes: u32,
    /// Post-condition checklist, the same for every plan.
    pub validations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl RecoveryPlan {
    #[cfg(test)]
    pub(crate) fn test_stub(incident_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            incident_id,
            steps: Vec::new(),
            estimated_total_minutes: 0,
            validations: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Outcome of one executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub order: u32,
    pub action: String,
    pub success: bool,
    pub message: String,
    pub completed_at: DateTime<Utc>,
}

/// Ordered outcome of a plan execution. When `success` is false,
/// `failed_step` holds the 1-based order of the step that halted execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryExecutionResult {
    pub plan_id: Uuid,
    pub incident_id: Uuid,
    pub step_results: Vec<StepResult>,
    pub success: bool,
    pub failed_step: Option<u32>,
    pub executed_at: DateTime<Utc>,
}

/// Collaborator that actually performs a remediation step.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn run_step(&self, incident: &Incident, step: &RecoveryStep) -> Result<String, StepError>;
}

/// Step executor that reports every step done without doing anything.
/// Used where remediation is operator-driven and the plan is a checklist.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChecklistExecutor;

#[async_trait]
impl StepExecutor for ChecklistExecutor {
    async fn run_step(
        &self,
        _incident: &Incident,
        step: &RecoveryStep,
    ) -> Result<String, StepError> {
        Ok(format!("acknowledged: {}", step.action))
    }
}

/// The fixed validation checklist attached to every plan.
pub(crate) fn validation_checklist() -> Vec<String> {
    [
        "verify system integrity",
        "confirm no residual unauthorized access",
        "validate data consistency",
        "confirm monitoring coverage restored",
        "document residual risk",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Type-keyed step template. Estimates are fixed per step.
pub(crate) fn step_template(incident_type: IncidentType) -> Vec<(&'static str, u32)> {
    match incident_type {
        IncidentType::DataBreach => vec![
            ("rotate all credentials with access to affected data", 30),
            ("patch the exploited access path", 60),
            ("restore affected records from verified backups", 90),
            ("re-enable access for cleared accounts", 20),
            ("notify data owners of restoration", 15),
        ],
        IncidentType::Malware | IncidentType::SystemCompromise => vec![
            ("reimage affected systems from golden images", 120),
            ("restore data from pre-infection backups", 90),
            ("rotate credentials used on affected systems", 30),
            ("rejoin systems to the network with monitoring", 30),
        ],
        IncidentType::UnauthorizedAccess | IncidentType::InsiderThreat => vec![
            ("audit and revoke residual grants", 45),
            ("rotate credentials for touched accounts", 30),
            ("restore modified records from backups", 60),
            ("re-certify access for affected roles", 30),
        ],
        IncidentType::DenialOfService => vec![
            ("remove upstream traffic filters once attack subsides", 15),
            ("restore service capacity to baseline", 30),
            ("verify dependent service health", 20),
        ],
        IncidentType::DataLoss => vec![
            ("restore lost data from most recent verified backup", 120),
            ("reconcile restored data against transaction logs", 60),
            ("verify downstream consumers", 30),
        ],
        // Generic fallback for types without a tailored script.
        IncidentType::PolicyViolation | IncidentType::PhysicalBreach => vec![
            ("assess residual exposure", 30),
            ("restore normal operations", 45),
            ("verify controls are back in place", 30),
        ],
    }
}

/// The recovery planner and executor.
pub struct RecoveryPlanner {
    executor: Arc<dyn StepExecutor>,
    clock: Arc<dyn Clock>,
}

impl RecoveryPlanner {
    pub fn new(executor: Arc<dyn StepExecutor>, clock: Arc<dyn Clock>) -> Self {
        Self { executor, clock }
    }

    /// Generates a plan for the incident from its type's template.
    #[instrument(skip(self, incident), fields(incident_id = %incident.incident_id))]
    pub fn generate_plan(&self, incident: &Incident) -> RecoveryPlan {
        let steps: Vec<RecoveryStep> = step_template(incident.incident_type)
            .into_iter()
            .enumerate()
            .map(|(i, (action, estimated_minutes))| RecoveryStep {
                order: i as u32 + 1,
                action: action.to_string(),
                estimated_minutes,
            })
            .collect();
        let estimated_total_minutes = steps.iter().map(|s| s.estimated_minutes).sum();

        info!(
            steps = steps.len(),
            estimated_total_minutes, "generated recovery plan"
        );

        RecoveryPlan {
            id: Uuid::new_v4(),
            incident_id: incident.id,
            steps,
            estimated_total_minutes,
            validations: validation_checklist(),
            created_at: self.clock.now(),
        }
    }

    /// Executes the plan strictly in order, stopping at the first failing
    /// step. The failing step's order is surfaced in the result.
    #[instrument(skip(self, incident, plan), fields(incident_id = %incident.incident_id, plan_id = %plan.id))]
    pub async fn execute_plan(
        &self,
        incident: &Incident,
        plan: &RecoveryPlan,
    ) -> RecoveryExecutionResult {
        let mut step_results = Vec::with_capacity(plan.steps.len());
        let mut failed_step = None;

        for step in &plan.steps {
            match self.executor.run_step(incident, step).await {
                Ok(message) => {
                    step_results.push(StepResult {
                        order: step.order,
                        action: step.action.clone(),
                        success: true,
                        message,
                        completed_at: self.clock.now(),
                    });
                }
                Err(e) => {
                    warn!(step = step.order, error = %e, "recovery halted at failing step");
                    step_results.push(StepResult {
                        order: step.order,
                        action: step.action.clone(),
                        success: false,
                        message: e.to_string(),
                        completed_at: self.clock.now(),
                    });
                    failed_step = Some(step.order);
                    break;
                }
            }
        }

        RecoveryExecutionResult {
            plan_id: plan.id,
            incident_id: incident.id,
            success: failed_step.is_none(),
            step_results,
            failed_step,
            executed_at: self.clock.now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::incident::{DetectionMethod, Findings, Severity};

    struct FailAt {
        order: u32,
    }

    #[async_trait]
    impl StepExecutor for FailAt {
        async fn run_step(
            &self,
            _incident: &Incident,
            step: &RecoveryStep,
        ) -> Result<String, StepError> {
            if step.order == self.order {
                Err(StepError::Failed(format!("step {} refused", step.order)))
            } else {
                Ok("done".to_string())
            }
        }
    }

    fn incident(incident_type: IncidentType) -> Incident {
        Incident::new(
            incident_type,
            Severity::High,
            "test".to_string(),
            None,
            vec![],
            vec![],
            DetectionMethod::Manual,
            Findings::None,
            Utc::now(),
        )
    }

    fn planner(executor: Arc<dyn StepExecutor>) -> RecoveryPlanner {
        RecoveryPlanner::new(executor, Arc::new(SystemClock))
    }

    #[test]
    fn plan_total_is_sum_of_steps() {
        let p = planner(Arc::new(ChecklistExecutor));
        let plan = p.generate_plan(&incident(IncidentType::DataBreach));
        let sum: u32 = plan.steps.iter().map(|s| s.estimated_minutes).sum();
        assert_eq!(plan.estimated_total_minutes, sum);
        assert_eq!(plan.steps.len(), 5);
        // Orders are 1-based and contiguous.
        for (i, step) in plan.steps.iter().enumerate() {
            assert_eq!(step.order, i as u32 + 1);
        }
        assert!(!plan.validations.is_empty());
    }

    #[test]
    fn fallback_template_covers_untailored_types() {
        let p = planner(Arc::new(ChecklistExecutor));
        let plan = p.generate_plan(&incident(IncidentType::PhysicalBreach));
        assert!(!plan.steps.is_empty());
    }

    #[tokio::test]
    async fn full_success_marks_result_successful() {
        let p = planner(Arc::new(ChecklistExecutor));
        let incident = incident(IncidentType::Malware);
        let plan = p.generate_plan(&incident);
        let result = p.execute_plan(&incident, &plan).await;
        assert!(result.success);
        assert_eq!(result.step_results.len(), plan.steps.len());
        assert!(result.failed_step.is_none());
    }

    #[tokio::test]
    async fn execution_halts_at_first_failure() {
        let p = planner(Arc::new(FailAt { order: 3 }));
        let incident = incident(IncidentType::DataBreach);
        let plan = p.generate_plan(&incident);
        assert_eq!(plan.steps.len(), 5);

        let result = p.execute_plan(&incident, &plan).await;
        assert!(!result.success);
        assert_eq!(result.failed_step, Some(3));
        // Two successes, then the failing step, nothing after.
        assert_eq!(result.step_results.len(), 3);
        assert_eq!(
            result
                .step_results
                .iter()
                .filter(|r| r.success)
                .count(),
            2
        );
        assert!(!result.step_results[2].success);
    }
}
