//! # vigil-actions
//!
//! Containment actions for Vigil.
//!
//! This crate provides the action registry, the built-in containment
//! actions, the connector seams they execute through, and the dispatcher
//! that plugs into the core registry's containment seam.

pub mod backup_evidence;
pub mod block_ip;
pub mod connectors;
pub mod disable_account;
pub mod dispatcher;
pub mod isolate_system;
pub mod quarantine_file;
pub mod registry;
pub mod reset_credentials;
pub mod revoke_access;
pub mod terminate_sessions;
pub mod testing;

pub use backup_evidence::BackupEvidenceAction;
pub use block_ip::{BlockIpAction, DEFAULT_BLOCK_HOURS};
pub use connectors::{
    ConnectorError, DirectoryService, EvidenceVault, FileQuarantine, NetworkController,
    SessionBroker,
};
pub use disable_account::DisableAccountAction;
pub use dispatcher::RegistryDispatcher;
pub use isolate_system::IsolateSystemAction;
pub use quarantine_file::QuarantineFileAction;
pub use registry::{ActionContext, ActionError, ActionRegistry, ContainmentAction};
pub use reset_credentials::ResetCredentialsAction;
pub use revoke_access::RevokeAccessAction;
pub use terminate_sessions::TerminateSessionsAction;

use std::sync::Arc;

/// Builds a registry with every built-in action wired to the given
/// connectors.
pub fn standard_registry(
    network: Arc<dyn NetworkController>,
    directory: Arc<dyn DirectoryService>,
    sessions: Arc<dyn SessionBroker>,
    quarantine: Arc<dyn FileQuarantine>,
    vault: Arc<dyn EvidenceVault>,
) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(IsolateSystemAction::new(Arc::clone(&network))));
    registry.register(Arc::new(BlockIpAction::new(network)));
    registry.register(Arc::new(DisableAccountAction::new(Arc::clone(&directory))));
    registry.register(Arc::new(RevokeAccessAction::new(Arc::clone(&directory))));
    registry.register(Arc::new(ResetCredentialsAction::new(directory)));
    registry.register(Arc::new(TerminateSessionsAction::new(sessions)));
    registry.register(Arc::new(QuarantineFileAction::new(quarantine)));
    registry.register(Arc::new(BackupEvidenceAction::new(vault)));
    registry
}

/// Convenience constructor: every built-in action against one stub
/// connector. Used by tests and local single-node runs.
pub fn stub_dispatcher() -> RegistryDispatcher {
    let stub = Arc::new(testing::StubConnector::new());
    RegistryDispatcher::new(standard_registry(
        Arc::clone(&stub) as _,
        Arc::clone(&stub) as _,
        Arc::clone(&stub) as _,
        Arc::clone(&stub) as _,
        stub as _,
    ))
}
