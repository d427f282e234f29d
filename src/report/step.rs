use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message prefix recorded for stages that never ran because a dependency failed
pub const SKIPPED_UPSTREAM: &str = "skipped due to upstream failure";

/// Pipeline phase a step belongs to; also scopes diagnostic patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    ProtoGen,
    Build,
    FrontendGen,
    ConfigGen,
    Restart,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::ProtoGen => "proto-gen",
            Phase::Build => "build",
            Phase::FrontendGen => "frontend-gen",
            Phase::ConfigGen => "config-gen",
            Phase::Restart => "restart",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Why a step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Not executed because an upstream stage failed
    CascadedSkip,
    /// The build, generate or lifecycle action itself failed
    ToolFailure,
    /// Bounded readiness wait expired
    ReadinessTimeout,
    /// The run was interrupted
    Cancellation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::CascadedSkip => "cascaded skip",
            FailureKind::ToolFailure => "tool failure",
            FailureKind::ReadinessTimeout => "readiness timeout",
            FailureKind::Cancellation => "cancelled",
        };
        f.write_str(s)
    }
}

/// Output captured from an external tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.trim().is_empty() && self.stderr.trim().is_empty()
    }

    /// Stderr followed by stdout, the text handed to the pattern matcher
    pub fn combined(&self) -> String {
        match (self.stderr.is_empty(), self.stdout.is_empty()) {
            (true, _) => self.stdout.clone(),
            (false, true) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stderr, self.stdout),
        }
    }

    /// Concatenates another captured output onto this one
    pub fn append(&mut self, other: ToolOutput) {
        fn join(into: &mut String, more: String) {
            if more.is_empty() {
                return;
            }
            if !into.is_empty() && !into.ends_with('\n') {
                into.push('\n');
            }
            into.push_str(&more);
        }
        join(&mut self.stdout, other.stdout);
        join(&mut self.stderr, other.stderr);
    }
}

/// Immutable outcome of one pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub phase: Phase,
    pub service: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    #[serde(default)]
    pub output: ToolOutput,
}

impl StepResult {
    pub fn succeeded(
        phase: Phase,
        service: impl Into<String>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        output: ToolOutput,
    ) -> Self {
        Self {
            phase,
            service: service.into(),
            success: true,
            error_message: None,
            failure: None,
            note: None,
            started_at,
            ended_at,
            output,
        }
    }

    pub fn failed(
        phase: Phase,
        service: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        output: ToolOutput,
    ) -> Self {
        Self {
            phase,
            service: service.into(),
            success: false,
            error_message: Some(message.into()),
            failure: Some(kind),
            note: None,
            started_at,
            ended_at,
            output,
        }
    }

    /// Synthetic failed result for a stage whose dependency failed; zero duration
    pub fn skipped(
        phase: Phase,
        service: impl Into<String>,
        cause: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self::failed(
            phase,
            service,
            FailureKind::CascadedSkip,
            format!("{}: {}", SKIPPED_UPSTREAM, cause),
            at,
            at,
            ToolOutput::default(),
        )
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn duration(&self) -> Duration {
        self.ended_at - self.started_at
    }

    pub fn is_cascaded_skip(&self) -> bool {
        self.failure == Some(FailureKind::CascadedSkip)
    }

    pub fn is_cancelled(&self) -> bool {
        self.failure == Some(FailureKind::Cancellation)
    }

    /// Text used for re-diagnosis: captured output, or the error message when nothing was captured
    pub fn diagnostic_text(&self) -> String {
        if self.output.is_empty() {
            self.error_message.clone().unwrap_or_default()
        } else {
            self.output.combined()
        }
    }
}
