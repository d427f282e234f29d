//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { run_id, stages } => {
                info!(run = %run_id, stages, "Starting rebuild");
            }
            ProgressEvent::StageStarted { phase, service } => {
                info!(phase = %phase, service = %service, "Starting stage");
            }
            ProgressEvent::StageCompleted {
                phase,
                service,
                success,
                duration,
            } => {
                if *success {
                    info!(
                        phase = %phase,
                        service = %service,
                        duration_ms = duration.as_millis(),
                        "Stage complete"
                    );
                } else {
                    warn!(
                        phase = %phase,
                        service = %service,
                        duration_ms = duration.as_millis(),
                        "Stage failed"
                    );
                }
            }
            ProgressEvent::StageSkipped {
                phase,
                service,
                cause,
            } => {
                warn!(phase = %phase, service = %service, cause = %cause, "Stage skipped");
            }
            ProgressEvent::WaitingForReadiness { service, timeout } => {
                info!(
                    service = %service,
                    timeout_secs = timeout.as_secs(),
                    "Waiting for service readiness"
                );
            }
            ProgressEvent::ShortCircuit { reason } => {
                info!(reason = %reason, "Rebuild stopped early");
            }
            ProgressEvent::Cancelled => {
                warn!("Rebuild cancelled");
            }
            ProgressEvent::ReportSaved { path } => {
                debug!(path = %path, "Report saved");
            }
            ProgressEvent::ReportSaveFailed { error } => {
                warn!(error = %error, "Failed to save rebuild report");
            }
            ProgressEvent::Completed {
                failed,
                total,
                total_time,
            } => {
                if *failed > 0 {
                    warn!(
                        failed,
                        total,
                        total_time_ms = total_time.as_millis(),
                        "Rebuild finished with failures"
                    );
                } else {
                    info!(
                        total,
                        total_time_ms = total_time.as_millis(),
                        "Rebuild complete"
                    );
                }
            }
        }
    }
}
