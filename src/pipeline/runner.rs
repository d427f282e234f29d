//! Generic dependency-aware stage executor
//!
//! Groups run in order. Before a stage runs, its declared dependencies are checked
//! against the set of stages that already failed; a blocked stage is recorded as a
//! cascaded skip and its action is dropped unpolled. Stages inside a group are
//! independent of each other and run one after another or concurrently per
//! [`ExecutionPolicy`]; either way all of them are attempted and their results are
//! recorded in declaration order.

use super::config::ExecutionPolicy;
use super::stage::{ActionOutcome, Stage, StageGroup, StageId, StageNode};
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::report::{FailureKind, RebuildReport, ReportError, StepResult};
use chrono::Utc;
use futures_util::future::join_all;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How a run over a plan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Every group was processed
    Completed,
    /// A stage asked to stop early
    Halted,
    Cancelled,
}

/// A group member after its dependencies were checked
enum Planned<'a> {
    Skip(StageNode, String),
    Run(Stage<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Halt,
    Cancel,
}

pub struct StageRunner<'h> {
    policy: ExecutionPolicy,
    cancel: CancellationToken,
    progress: &'h dyn ProgressHandler,
}

impl<'h> StageRunner<'h> {
    pub fn new(
        policy: ExecutionPolicy,
        cancel: CancellationToken,
        progress: &'h dyn ProgressHandler,
    ) -> Self {
        Self {
            policy,
            cancel,
            progress,
        }
    }

    pub async fn run(
        &self,
        groups: Vec<StageGroup<'_>>,
        report: &mut RebuildReport,
    ) -> Result<RunState, ReportError> {
        let mut failed: HashSet<StageId> = HashSet::new();

        for group in groups {
            let planned: Vec<Planned<'_>> = group
                .stages
                .into_iter()
                .map(|stage| {
                    let cause = stage.node.blocked_by(&failed).map(|d| d.cause.clone());
                    match cause {
                        Some(cause) => Planned::Skip(stage.node, cause),
                        None => Planned::Run(stage),
                    }
                })
                .collect();

            let flow = match self.policy {
                ExecutionPolicy::Sequential => {
                    self.run_sequential(planned, report, &mut failed).await?
                }
                ExecutionPolicy::Concurrent => {
                    self.run_concurrent(planned, report, &mut failed).await?
                }
            };

            match flow {
                Flow::Continue => {}
                Flow::Halt => return Ok(RunState::Halted),
                Flow::Cancel => {
                    self.progress.on_progress(&ProgressEvent::Cancelled);
                    return Ok(RunState::Cancelled);
                }
            }
        }

        Ok(RunState::Completed)
    }

    async fn run_sequential(
        &self,
        planned: Vec<Planned<'_>>,
        report: &mut RebuildReport,
        failed: &mut HashSet<StageId>,
    ) -> Result<Flow, ReportError> {
        for item in planned {
            match item {
                Planned::Skip(node, cause) => self.record_skip(&node, &cause, report, failed)?,
                Planned::Run(stage) => {
                    if self.cancel.is_cancelled() {
                        return Ok(Flow::Cancel);
                    }
                    let (node, result, flow) = self.execute(stage).await;
                    self.record(&node, result, report, failed)?;
                    if flow != Flow::Continue {
                        return Ok(flow);
                    }
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Runs the group's runnable stages together, then records every slot in order
    async fn run_concurrent(
        &self,
        planned: Vec<Planned<'_>>,
        report: &mut RebuildReport,
        failed: &mut HashSet<StageId>,
    ) -> Result<Flow, ReportError> {
        let mut slots = Vec::with_capacity(planned.len());
        let mut runnable = Vec::new();
        for item in planned {
            match item {
                Planned::Skip(node, cause) => slots.push(Some((node, cause))),
                Planned::Run(stage) => {
                    slots.push(None);
                    runnable.push(stage);
                }
            }
        }

        if !runnable.is_empty() && self.cancel.is_cancelled() {
            // same records as the sequential path: skips ahead of the first runnable stage
            for (node, cause) in slots.into_iter().map_while(|slot| slot) {
                self.record_skip(&node, &cause, report, failed)?;
            }
            return Ok(Flow::Cancel);
        }

        let mut outcomes = join_all(runnable.into_iter().map(|stage| self.execute(stage)))
            .await
            .into_iter();

        let mut group_flow = Flow::Continue;
        for slot in slots {
            match slot {
                Some((node, cause)) => self.record_skip(&node, &cause, report, failed)?,
                None => {
                    if let Some((node, result, flow)) = outcomes.next() {
                        self.record(&node, result, report, failed)?;
                        group_flow = match (group_flow, flow) {
                            (Flow::Cancel, _) | (_, Flow::Cancel) => Flow::Cancel,
                            (Flow::Halt, _) | (_, Flow::Halt) => Flow::Halt,
                            _ => Flow::Continue,
                        };
                    }
                }
            }
        }
        Ok(group_flow)
    }

    async fn execute(&self, stage: Stage<'_>) -> (StageNode, StepResult, Flow) {
        let Stage { node, action } = stage;
        self.progress.on_progress(&ProgressEvent::StageStarted {
            phase: node.phase,
            service: node.service.clone(),
        });

        let started_at = Utc::now();
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => ActionOutcome::cancelled(),
            outcome = action => outcome,
        };
        let ended_at = Utc::now();

        let (result, flow) = match outcome {
            ActionOutcome::Succeeded { output, note } => {
                let mut result =
                    StepResult::succeeded(node.phase, &node.service, started_at, ended_at, output);
                result.note = note;
                (result, Flow::Continue)
            }
            ActionOutcome::Halt { note } => {
                self.progress.on_progress(&ProgressEvent::ShortCircuit {
                    reason: note.clone(),
                });
                let result = StepResult::succeeded(
                    node.phase,
                    &node.service,
                    started_at,
                    ended_at,
                    Default::default(),
                )
                .with_note(note);
                (result, Flow::Halt)
            }
            ActionOutcome::Failed {
                kind,
                message,
                output,
            } => {
                let flow = if kind == FailureKind::Cancellation {
                    Flow::Cancel
                } else {
                    Flow::Continue
                };
                let result = StepResult::failed(
                    node.phase,
                    &node.service,
                    kind,
                    message,
                    started_at,
                    ended_at,
                    output,
                );
                (result, flow)
            }
        };

        self.progress.on_progress(&ProgressEvent::StageCompleted {
            phase: node.phase,
            service: node.service.clone(),
            success: result.success,
            duration: result.duration().to_std().unwrap_or_default(),
        });
        (node, result, flow)
    }

    fn record(
        &self,
        node: &StageNode,
        result: StepResult,
        report: &mut RebuildReport,
        failed: &mut HashSet<StageId>,
    ) -> Result<(), ReportError> {
        if !result.success {
            failed.insert(node.id);
        }
        report.record(result)
    }

    fn record_skip(
        &self,
        node: &StageNode,
        cause: &str,
        report: &mut RebuildReport,
        failed: &mut HashSet<StageId>,
    ) -> Result<(), ReportError> {
        failed.insert(node.id);
        debug!(stage = %node.id, cause, "Skipping stage");
        self.progress.on_progress(&ProgressEvent::StageSkipped {
            phase: node.phase,
            service: node.service.clone(),
            cause: cause.to_string(),
        });
        report.record(StepResult::skipped(node.phase, &node.service, cause, Utc::now()))
    }
}
