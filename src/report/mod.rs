//! Per-step outcome records and the aggregate rebuild report
//!
//! Every pipeline stage produces exactly one [`StepResult`]. Results are appended to a
//! [`RebuildReport`] in execution order and the report is finalized once at the end of the
//! run, after which its failure tally is available for rendering and persistence.

mod rebuild_report;
mod step;

pub use rebuild_report::{RebuildReport, ReportError, ReportSummary};
pub use step::{FailureKind, Phase, StepResult, ToolOutput, SKIPPED_UPSTREAM};
