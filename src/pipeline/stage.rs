use crate::report::{FailureKind, Phase, ToolOutput};
use crate::services::ToolResult;
use futures_util::future::BoxFuture;
use std::collections::HashSet;
use std::fmt;

/// Identity of a rebuild stage, used to declare dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    SchemaGen,
    PrimaryBuild,
    ApiBuild,
    BinaryA,
    BinaryB,
    ConfigGen,
    Restart,
    Frontend,
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageId::SchemaGen => "schema-gen",
            StageId::PrimaryBuild => "primary-build",
            StageId::ApiBuild => "api-build",
            StageId::BinaryA => "binary-a",
            StageId::BinaryB => "binary-b",
            StageId::ConfigGen => "config-gen",
            StageId::Restart => "restart",
            StageId::Frontend => "frontend",
        };
        f.write_str(s)
    }
}

/// Upstream stage plus the cause cited when it blocks this one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub stage: StageId,
    pub cause: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageNode {
    pub id: StageId,
    pub phase: Phase,
    pub service: String,
    pub depends_on: Vec<Dependency>,
}

impl StageNode {
    pub fn new(id: StageId, phase: Phase, service: impl Into<String>) -> Self {
        Self {
            id,
            phase,
            service: service.into(),
            depends_on: Vec::new(),
        }
    }

    pub fn after(mut self, stage: StageId, cause: impl Into<String>) -> Self {
        self.depends_on.push(Dependency {
            stage,
            cause: cause.into(),
        });
        self
    }

    /// First declared dependency that failed, if any
    pub fn blocked_by(&self, failed: &HashSet<StageId>) -> Option<&Dependency> {
        self.depends_on.iter().find(|d| failed.contains(&d.stage))
    }
}

/// What a stage action reports back to the runner
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Succeeded {
        output: ToolOutput,
        note: Option<String>,
    },
    Failed {
        kind: FailureKind,
        message: String,
        output: ToolOutput,
    },
    /// Successful step that ends the run early
    Halt { note: String },
}

impl ActionOutcome {
    pub fn cancelled() -> Self {
        ActionOutcome::Failed {
            kind: FailureKind::Cancellation,
            message: "cancelled".to_string(),
            output: ToolOutput::default(),
        }
    }
}

impl From<ToolResult> for ActionOutcome {
    fn from(result: ToolResult) -> Self {
        match result {
            Ok(output) => ActionOutcome::Succeeded { output, note: None },
            Err(e) => ActionOutcome::Failed {
                kind: FailureKind::ToolFailure,
                message: e.message,
                output: e.output,
            },
        }
    }
}

/// A node and the deferred work it performs
///
/// The action is a not-yet-polled future, so a stage that gets skipped never runs.
pub struct Stage<'a> {
    pub node: StageNode,
    pub action: BoxFuture<'a, ActionOutcome>,
}

impl<'a> Stage<'a> {
    pub fn new(node: StageNode, action: BoxFuture<'a, ActionOutcome>) -> Self {
        Self { node, action }
    }
}

/// Stages with no dependency on each other
pub struct StageGroup<'a> {
    pub stages: Vec<Stage<'a>>,
}

impl<'a> StageGroup<'a> {
    pub fn single(stage: Stage<'a>) -> Self {
        Self {
            stages: vec![stage],
        }
    }

    pub fn independent(stages: Vec<Stage<'a>>) -> Self {
        Self { stages }
    }
}
