//! # vigil-observability
//!
//! Logging, metrics, and audit infrastructure for Vigil.
//!
//! This crate provides structured logging with tracing, metric
//! registration, and the bounded in-memory audit trail that backs the
//! core audit seam.

pub mod audit;
pub mod logging;
pub mod metrics;

pub use audit::{AuditLog, AuditLogEntry, DEFAULT_MAX_ENTRIES};
pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
pub use metrics::describe_metrics;
