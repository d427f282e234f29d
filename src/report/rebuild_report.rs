use super::step::StepResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("Report {0} is already finalized")]
    AlreadyFinalized(String),
}

/// Failure tally computed by [`RebuildReport::finalize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub failed: usize,
    pub total: usize,
}

/// Append-only record of one rebuild run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    steps: Vec<StepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    summary: Option<ReportSummary>,
    #[serde(default)]
    pub cancelled: bool,
}

impl RebuildReport {
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: started_at.format("%Y%m%dT%H%M%S%.3fZ").to_string(),
            started_at,
            steps: Vec::new(),
            summary: None,
            cancelled: false,
        }
    }

    pub fn record(&mut self, step: StepResult) -> Result<(), ReportError> {
        if self.is_finalized() {
            return Err(ReportError::AlreadyFinalized(self.run_id.clone()));
        }
        self.steps.push(step);
        Ok(())
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Computes the failure tally; allowed exactly once
    pub fn finalize(&mut self) -> Result<ReportSummary, ReportError> {
        if self.is_finalized() {
            return Err(ReportError::AlreadyFinalized(self.run_id.clone()));
        }
        let summary = ReportSummary {
            failed: self.steps.iter().filter(|s| !s.success).count(),
            total: self.steps.len(),
        };
        self.summary = Some(summary);
        Ok(summary)
    }

    pub fn is_finalized(&self) -> bool {
        self.summary.is_some()
    }

    pub fn summary(&self) -> Option<ReportSummary> {
        self.summary
    }

    pub fn failed_count(&self) -> Option<usize> {
        self.summary.map(|s| s.failed)
    }

    pub fn total_count(&self) -> Option<usize> {
        self.summary.map(|s| s.total)
    }

    pub fn has_failures(&self) -> bool {
        match self.summary {
            Some(summary) => summary.failed > 0,
            None => self.steps.iter().any(|s| !s.success),
        }
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.iter().filter(|s| !s.success)
    }
}

impl Default for RebuildReport {
    fn default() -> Self {
        Self::new()
    }
}
