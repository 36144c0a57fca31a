//! Response playbooks: the read-only reference view of how each incident
//! type is handled. Assembled from the same tables the dispatcher and
//! recovery planner run from, so the published playbook can never drift
//! from actual behavior.

use crate::containment::default_actions;
use crate::incident::IncidentType;
use crate::recovery::{step_template, validation_checklist};
use crate::report::recommendations;
use serde::{Deserialize, Serialize};

/// One recovery step as published in a playbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookStep {
    pub order: u32,
    pub action: String,
    pub estimated_minutes: u32,
}

/// The full response playbook for one incident type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    pub incident_type: IncidentType,
    /// Default containment actions dispatched for this type.
    pub containment_actions: Vec<String>,
    /// Ordered recovery steps with per-step estimates.
    pub recovery_steps: Vec<PlaybookStep>,
    pub estimated_recovery_minutes: u32,
    /// Post-recovery validation checklist (type-independent).
    pub validations: Vec<String>,
    /// Recommendations attached to final reports for this type.
    pub recommendations: Vec<String>,
}

/// Builds the playbook for one incident type.
pub fn playbook(incident_type: IncidentType) -> Playbook {
    let recovery_steps: Vec<PlaybookStep> = step_template(incident_type)
        .into_iter()
        .enumerate()
        .map(|(i, (action, estimated_minutes))| PlaybookStep {
            order: i as u32 + 1,
            action: action.to_string(),
            estimated_minutes,
        })
        .collect();
    let estimated_recovery_minutes = recovery_steps.iter().map(|s| s.estimated_minutes).sum();

    Playbook {
        incident_type,
        containment_actions: default_actions(incident_type)
            .iter()
            .map(|a| a.name().to_string())
            .collect(),
        recovery_steps,
        estimated_recovery_minutes,
        validations: validation_checklist(),
        recommendations: recommendations(incident_type),
    }
}

/// All playbooks, in incident-type declaration order.
pub fn all_playbooks() -> Vec<Playbook> {
    IncidentType::ALL.iter().map(|&t| playbook(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_type_has_a_complete_playbook() {
        let playbooks = all_playbooks();
        assert_eq!(playbooks.len(), IncidentType::ALL.len());
        for playbook in &playbooks {
            assert!(!playbook.containment_actions.is_empty());
            assert!(!playbook.recovery_steps.is_empty());
            assert!(!playbook.validations.is_empty());
            assert!(!playbook.recommendations.is_empty());
        }
    }

    #[test]
    fn playbook_totals_match_step_estimates() {
        let playbook = playbook(IncidentType::DataBreach);
        let sum: u32 = playbook
            .recovery_steps
            .iter()
            .map(|s| s.estimated_minutes)
            .sum();
        assert_eq!(playbook.estimated_recovery_minutes, sum);
    }
}
