//! Progress handler trait and events

use crate::report::Phase;
use std::time::Duration;

/// Events emitted while a rebuild runs
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Rebuild started
    RunStarted { run_id: String, stages: usize },

    /// A stage began executing
    StageStarted { phase: Phase, service: String },

    /// A stage finished, successfully or not
    StageCompleted {
        phase: Phase,
        service: String,
        success: bool,
        duration: Duration,
    },

    /// A stage was not executed because a dependency failed
    StageSkipped {
        phase: Phase,
        service: String,
        cause: String,
    },

    /// Polling a service for readiness
    WaitingForReadiness { service: String, timeout: Duration },

    /// Run stopped early without failing
    ShortCircuit { reason: String },

    /// Run was cancelled
    Cancelled,

    /// Report persisted
    ReportSaved { path: String },

    /// Report could not be persisted
    ReportSaveFailed { error: String },

    /// Run finished and the report was finalized
    Completed {
        failed: usize,
        total: usize,
        total_time: Duration,
    },
}

/// Trait for handling progress events during a rebuild
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
