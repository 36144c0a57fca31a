//! Containment action trait and registry.
//!
//! Actions are small named units executed independently by the dispatcher.
//! The registry maps action names (the same names published in playbooks)
//! to implementations; unknown names are an unsupported-action failure for
//! that action only, never for the whole containment run.

use crate::connectors::ConnectorError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use vigil_core::{Incident, IncidentType};

/// Errors from one action execution.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("unsupported action: {0}")]
    Unsupported(String),

    #[error("nothing to act on: {0}")]
    NoTarget(String),

    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

/// The incident-scoped context an action executes against.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub incident_id: Uuid,
    pub public_id: String,
    pub incident_type: IncidentType,
    pub source: Option<String>,
    pub affected_systems: Vec<String>,
    pub affected_users: Vec<String>,
    /// Caller-supplied parameters, e.g. a block duration or file path.
    pub params: HashMap<String, serde_json::Value>,
}

impl ActionContext {
    pub fn from_incident(incident: &Incident) -> Self {
        Self {
            incident_id: incident.id,
            public_id: incident.incident_id.clone(),
            incident_type: incident.incident_type,
            source: incident.source.clone(),
            affected_systems: incident.affected_systems.clone(),
            affected_users: incident.affected_users.clone(),
            params: HashMap::new(),
        }
    }

    /// A string parameter, if present.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// An integer parameter, if present.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(|v| v.as_i64())
    }
}

/// One executable containment action.
#[async_trait]
pub trait ContainmentAction: Send + Sync {
    /// Registry name, matching [`vigil_core::ContainmentActionKind::name`]
    /// for the built-in actions.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Executes the action. Returns a human-readable summary on success.
    async fn execute(&self, context: &ActionContext) -> Result<String, ActionError>;
}

/// Name-keyed action registry.
#[derive(Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn ContainmentAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: Arc<dyn ContainmentAction>) {
        self.actions.insert(action.name().to_string(), action);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ContainmentAction>> {
        self.actions.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.actions.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    #[async_trait]
    impl ContainmentAction for Dummy {
        fn name(&self) -> &str {
            "dummy"
        }

        fn description(&self) -> &str {
            "does nothing"
        }

        async fn execute(&self, _context: &ActionContext) -> Result<String, ActionError> {
            Ok("done".to_string())
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = ActionRegistry::new();
        registry.register(Arc::new(Dummy));
        assert!(registry.get("dummy").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["dummy".to_string()]);
    }
}
