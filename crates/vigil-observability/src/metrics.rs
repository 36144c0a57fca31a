//! Metric registration for Vigil.
//!
//! Counter names are emitted from the core crates with the `metrics`
//! macros; this module registers their descriptions once at startup so
//! exporters publish proper help text.

use metrics::describe_counter;

/// Registers descriptions for every metric the orchestrator emits.
pub fn describe_metrics() {
    describe_counter!(
        "vigil_incidents_created_total",
        "Incidents created, by any path"
    );
    describe_counter!(
        "vigil_state_transitions_total",
        "Lifecycle transitions applied"
    );
    describe_counter!(
        "vigil_escalations_total",
        "Deadline escalations recorded"
    );
    describe_counter!(
        "vigil_containment_runs_total",
        "Containment runs dispatched"
    );
    describe_counter!(
        "vigil_containment_actions_total",
        "Individual containment actions, labeled by result"
    );
    describe_counter!(
        "vigil_recovery_executions_total",
        "Recovery plan executions"
    );
    describe_counter!(
        "vigil_detector_incidents_total",
        "Incidents created by the automated detector"
    );
    describe_counter!(
        "vigil_monitor_escalations_total",
        "Escalations raised by the deadline monitor"
    );
}
