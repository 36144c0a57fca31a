//! # vigil-api
//!
//! Administrative HTTP API for Vigil.
//!
//! Exposes the incident registry over axum: incident CRUD, lifecycle
//! transitions, containment, forensics, recovery, and reports. The
//! lifecycle semantics live in `vigil-core`; this crate only translates
//! HTTP to registry calls and registry errors to status codes.

pub mod dto;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ErrorResponse};
pub use server::{ApiServer, ApiServerConfig};
pub use state::AppState;
