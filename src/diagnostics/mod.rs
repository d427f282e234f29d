//! Failure diagnosis
//!
//! Turns raw tool output into ranked, actionable hints by scoring it against a catalog
//! of [`ErrorPattern`]s, and persists rebuild reports so past runs can be re-diagnosed.

pub mod catalog;
mod matcher;
mod pattern;
pub mod store;

pub use matcher::{PatternMatcher, PatternMatcherBuilder};
pub use pattern::{Confidence, Diagnosis, ErrorPattern, PatternError};
pub use store::{DiagnosticStore, FileDiagnosticStore, StoreError};

use crate::report::{RebuildReport, StepResult};
use serde::Serialize;

/// Diagnoses for one failed step of a report
#[derive(Debug, Clone, Serialize)]
pub struct StepDiagnosis<'a> {
    pub step: &'a StepResult,
    pub diagnoses: Vec<Diagnosis>,
}

/// How many diagnoses to collect per failed step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosisMode {
    /// Highest-scoring pattern only
    Best,
    /// Every matching pattern, highest confidence first
    All,
}

/// Re-runs the matcher over every failed step that actually executed
///
/// Cascaded skips are left out: their cause is another step in the same report.
pub fn diagnose_report<'a>(
    matcher: &PatternMatcher,
    report: &'a RebuildReport,
    mode: DiagnosisMode,
) -> Vec<StepDiagnosis<'a>> {
    report
        .failed_steps()
        .filter(|step| !step.is_cascaded_skip())
        .map(|step| {
            let text = step.diagnostic_text();
            let diagnoses = match mode {
                DiagnosisMode::Best => matcher
                    .diagnose(&text, &step.service, step.phase)
                    .into_iter()
                    .collect(),
                DiagnosisMode::All => matcher.diagnose_all(&text, &step.service, step.phase),
            };
            StepDiagnosis { step, diagnoses }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{FailureKind, Phase, ToolOutput};
    use chrono::Utc;

    #[test]
    fn test_diagnose_report_skips_cascades() {
        let now = Utc::now();
        let mut report = RebuildReport::new();
        report
            .record(StepResult::failed(
                Phase::ProtoGen,
                "schemas",
                FailureKind::ToolFailure,
                "exit status 1",
                now,
                now,
                ToolOutput::new("", "protoc-gen-go: program not found or is not executable"),
            ))
            .unwrap();
        report
            .record(StepResult::skipped(Phase::Build, "core", "schema generation failure", now))
            .unwrap();
        report
            .record(StepResult::succeeded(Phase::ConfigGen, "config", now, now, ToolOutput::default()))
            .unwrap();
        report.finalize().unwrap();

        let matcher = PatternMatcher::with_builtin_catalog().unwrap();
        let diagnosed = diagnose_report(&matcher, &report, DiagnosisMode::Best);
        assert_eq!(diagnosed.len(), 1);
        assert_eq!(diagnosed[0].step.service, "schemas");
        assert_eq!(diagnosed[0].diagnoses.len(), 1);
        assert_eq!(diagnosed[0].diagnoses[0].pattern, "protoc-plugin-missing");
    }
}
