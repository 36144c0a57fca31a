//! Background task scheduling.
//!
//! The detector and escalation monitor run as two independent interval
//! loops owned by a [`Scheduler`]. Ticks are driven by `tokio::time`
//! intervals that skip missed ticks, so one slow iteration never causes a
//! burst of catch-up work, and both loops stop promptly on shutdown. Both
//! components also expose `tick()` directly so tests can single-step them
//! without timers.

use crate::detector::PatternDetector;
use crate::monitor::EscalationMonitor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub struct Scheduler {
    detector: Arc<PatternDetector>,
    monitor: Arc<EscalationMonitor>,
    detector_interval: Duration,
    monitor_interval: Duration,
}

/// Handle to the running loops. Dropping it does not stop them; call
/// [`SchedulerHandle::shutdown`].
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signals both loops to stop and waits for them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "background task did not shut down cleanly");
            }
        }
        info!("background loops stopped");
    }
}

impl Scheduler {
    pub fn new(
        detector: Arc<PatternDetector>,
        monitor: Arc<EscalationMonitor>,
        detector_interval: Duration,
        monitor_interval: Duration,
    ) -> Self {
        Self {
            detector,
            monitor,
            detector_interval,
            monitor_interval,
        }
    }

    /// Spawns both loops.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let detector = Arc::clone(&self.detector);
        let mut detector_shutdown = shutdown_rx.clone();
        let detector_interval = self.detector_interval;
        let detector_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(detector_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let created = detector.tick().await;
                        if !created.is_empty() {
                            debug!(created = created.len(), "detector tick created incidents");
                        }
                    }
                    _ = detector_shutdown.changed() => break,
                }
            }
        });

        let monitor = Arc::clone(&self.monitor);
        let mut monitor_shutdown = shutdown_rx;
        let monitor_interval = self.monitor_interval;
        let monitor_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(monitor_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = monitor.tick().await {
                            warn!(error = %e, "escalation scan failed");
                        }
                    }
                    _ = monitor_shutdown.changed() => break,
                }
            }
        });

        info!(
            detector_interval_secs = detector_interval.as_secs(),
            monitor_interval_secs = monitor_interval.as_secs(),
            "background loops started"
        );

        SchedulerHandle {
            shutdown_tx,
            tasks: vec![detector_task, monitor_task],
        }
    }
}
