//! Output formatting for rebuild reports and diagnoses
//!
//! Reports and diagnoses render as JSON, YAML, or human-readable text. Human output
//! goes to stdout; logs stay on stderr.
//!
//! # Example
//!
//! ```ignore
//! use devstack::cli::output::{OutputFormat, OutputFormatter};
//!
//! let formatter = OutputFormatter::new(OutputFormat::Human);
//! println!("{}", formatter.format_report(&report)?);
//! ```

use anyhow::{Context, Result};
use serde_json::json;

use crate::diagnostics::StepDiagnosis;
use crate::report::{RebuildReport, StepResult};

const RULE_WIDTH: usize = 42;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format
    Yaml,
    /// Human-readable formatted text
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a finalized rebuild report
    pub fn format_report(&self, report: &RebuildReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize rebuild report to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("Failed to serialize rebuild report to YAML")
            }
            OutputFormat::Human => Ok(self.format_report_human(report)),
        }
    }

    /// Formats the diagnoses computed for a report's failed steps
    pub fn format_diagnoses(
        &self,
        report: &RebuildReport,
        diagnosed: &[StepDiagnosis<'_>],
    ) -> Result<String> {
        let structured = json!({
            "run_id": report.run_id,
            "started_at": report.started_at,
            "failed": report.failed_count(),
            "total": report.total_count(),
            "steps": diagnosed,
        });
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&structured)
                .context("Failed to serialize diagnoses to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&structured).context("Failed to serialize diagnoses to YAML")
            }
            OutputFormat::Human => Ok(self.format_diagnoses_human(report, diagnosed)),
        }
    }

    fn format_report_human(&self, report: &RebuildReport) -> String {
        let mut output = String::new();
        let failed = report.failed_count().unwrap_or(0);
        let total = report.total_count().unwrap_or(report.steps().len());

        if report.cancelled {
            output.push_str(&format!("\u{26A0} Rebuild cancelled ({} of {} steps failed)\n", failed, total));
        } else if failed > 0 {
            output.push_str(&format!("\u{2717} Rebuild failed ({} of {} steps failed)\n", failed, total));
        } else {
            output.push_str(&format!("\u{2713} Rebuild succeeded ({} steps)\n", total));
        }
        output.push_str(&rule());
        output.push_str(&format!("Run:  {}\n\n", report.run_id));

        output.push_str(&format!(
            "{:<14} {:<12} {:<8} {:>9}\n",
            "PHASE", "SERVICE", "STATUS", "DURATION"
        ));
        for step in report.steps() {
            output.push_str(&format!(
                "{:<14} {:<12} {:<8} {:>9}\n",
                step.phase,
                step.service,
                status_label(step),
                format_duration(step)
            ));
            if let Some(note) = &step.note {
                output.push_str(&format!("\u{2514}\u{2500} {}\n", note));
            }
            if let Some(message) = &step.error_message {
                output.push_str(&format!("\u{2514}\u{2500} {}\n", message));
            }
        }

        if report.has_failures() {
            output.push_str("\nRun `devstack diagnose` for suggested fixes.\n");
        }
        output
    }

    fn format_diagnoses_human(
        &self,
        report: &RebuildReport,
        diagnosed: &[StepDiagnosis<'_>],
    ) -> String {
        let mut output = String::new();
        output.push_str(&format!("Diagnosis for run {}\n", report.run_id));
        output.push_str(&rule());

        if diagnosed.is_empty() {
            output.push_str("No failed steps to diagnose.\n");
            return output;
        }

        for entry in diagnosed {
            let step = entry.step;
            output.push_str(&format!("\u{2717} {} {}\n", step.phase, step.service));
            if let Some(message) = &step.error_message {
                output.push_str(&format!("   {}\n", message));
            }
            if entry.diagnoses.is_empty() {
                output.push_str("   No known pattern matched this output.\n\n");
                continue;
            }
            for (i, diagnosis) in entry.diagnoses.iter().enumerate() {
                let connector = if i == entry.diagnoses.len() - 1 {
                    "\u{2514}"
                } else {
                    "\u{251C}"
                };
                output.push_str(&format!(
                    "{}\u{2500} [{}] {}: {}\n",
                    connector, diagnosis.confidence, diagnosis.pattern, diagnosis.hint
                ));
                output.push_str(&format!("     fix: {}\n", diagnosis.suggestion));
            }
            output.push('\n');
        }
        output
    }
}

fn rule() -> String {
    format!("{}\n", "\u{2501}".repeat(RULE_WIDTH))
}

fn status_label(step: &StepResult) -> &'static str {
    if step.success {
        "ok"
    } else if step.is_cascaded_skip() {
        "skipped"
    } else if step.is_cancelled() {
        "cancel"
    } else {
        "FAILED"
    }
}

fn format_duration(step: &StepResult) -> String {
    let ms = step.duration().num_milliseconds().max(0);
    if ms >= 1000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}ms", ms)
    }
}
