//! Lifecycle state machine for incidents.
//!
//! Transitions are forward-only along a fixed table. Anything not listed is
//! a hard error; there is no clamping and no backward movement. Terminal
//! states have no outgoing edges.

use crate::incident::{Incident, IncidentState, StateChange};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by transition validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: IncidentState,
        to: IncidentState,
    },
}

/// The directed transition table. `Detected -> Contained` exists for
/// automated containment that skips triage.
const TRANSITIONS: &[(IncidentState, IncidentState)] = &[
    (IncidentState::Detected, IncidentState::Triaged),
    (IncidentState::Detected, IncidentState::Contained),
    (IncidentState::Triaged, IncidentState::Contained),
    (IncidentState::Contained, IncidentState::Eradicated),
    (IncidentState::Eradicated, IncidentState::Recovered),
    (IncidentState::Recovered, IncidentState::LessonsLearned),
    (IncidentState::LessonsLearned, IncidentState::Closed),
];

/// Whether `from -> to` is a listed edge.
pub fn is_valid_transition(from: IncidentState, to: IncidentState) -> bool {
    TRANSITIONS.iter().any(|&(f, t)| f == from && t == to)
}

/// States reachable from `from` in one step.
pub fn allowed_targets(from: IncidentState) -> Vec<IncidentState> {
    TRANSITIONS
        .iter()
        .filter(|&&(f, _)| f == from)
        .map(|&(_, t)| t)
        .collect()
}

/// Validates the transition against the table.
pub fn validate_transition(
    from: IncidentState,
    to: IncidentState,
) -> Result<(), LifecycleError> {
    if is_valid_transition(from, to) {
        Ok(())
    } else {
        Err(LifecycleError::InvalidTransition { from, to })
    }
}

/// Applies a validated transition to the incident: appends to the history,
/// sets the new state, and bumps `last_updated`. The history is append-only;
/// callers never touch it directly.
pub fn apply_transition(
    incident: &mut Incident,
    to: IncidentState,
    actor: &str,
    notes: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    validate_transition(incident.state, to)?;
    incident.state_history.push(StateChange {
        from: Some(incident.state),
        to,
        timestamp: now,
        actor: actor.to_string(),
        notes,
    });
    incident.state = to;
    incident.last_updated = now;
    Ok(())
}
