//! YAML configuration for the orchestrator.
//!
//! Detection thresholds and lookback windows are configuration inputs with
//! the historical defaults, not literals buried in the detector.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VigilConfig {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub forensics: ForensicsConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl VigilConfig {
    /// Loads configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

/// Automated detector tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Seconds between evaluation ticks.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Trailing window for the exfiltration pattern, in minutes.
    #[serde(default = "default_exfil_window")]
    pub exfil_window_minutes: i64,
    /// Download/export event count that trips the exfiltration pattern.
    #[serde(default = "default_exfil_count")]
    pub exfil_event_threshold: u64,
    /// Cumulative transferred bytes that trip the exfiltration pattern.
    #[serde(default = "default_exfil_bytes")]
    pub exfil_byte_threshold: u64,
    /// Trailing window for the brute-force pattern, in minutes.
    #[serde(default = "default_brute_window")]
    pub brute_force_window_minutes: i64,
    /// Failed-authentication count that trips the brute-force pattern.
    #[serde(default = "default_brute_count")]
    pub brute_force_threshold: u64,
}

fn default_tick_secs() -> u64 {
    60
}
fn default_exfil_window() -> i64 {
    60
}
fn default_exfil_count() -> u64 {
    50
}
fn default_exfil_bytes() -> u64 {
    1024 * 1024 * 1024
}
fn default_brute_window() -> i64 {
    5
}
fn default_brute_count() -> u64 {
    10
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            exfil_window_minutes: default_exfil_window(),
            exfil_event_threshold: default_exfil_count(),
            exfil_byte_threshold: default_exfil_bytes(),
            brute_force_window_minutes: default_brute_window(),
            brute_force_threshold: default_brute_count(),
        }
    }
}

/// Escalation monitor tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between deadline scans.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
        }
    }
}

/// Forensics collection bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForensicsConfig {
    /// Half-width of the log extraction window around incident creation,
    /// in minutes.
    #[serde(default = "default_log_window")]
    pub log_window_minutes: i64,
    /// Maximum log rows collected per incident.
    #[serde(default = "default_max_log_rows")]
    pub max_log_rows: usize,
    /// Look-back for per-system access events, in minutes.
    #[serde(default = "default_access_lookback")]
    pub access_lookback_minutes: i64,
    /// Look-back for source-address connection history, in hours.
    #[serde(default = "default_capture_hours")]
    pub network_capture_hours: i64,
}

fn default_log_window() -> i64 {
    60
}
fn default_max_log_rows() -> usize {
    1000
}
fn default_access_lookback() -> i64 {
    60
}
fn default_capture_hours() -> i64 {
    24
}

impl Default for ForensicsConfig {
    fn default() -> Self {
        Self {
            log_window_minutes: default_log_window(),
            max_log_rows: default_max_log_rows(),
            access_lookback_minutes: default_access_lookback(),
            network_capture_hours: default_capture_hours(),
        }
    }
}

/// API listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}
