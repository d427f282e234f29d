//! The seven-stage rebuild workflow
//!
//! ```text
//! 1 schema-gen ─> 2 primary-build ─> 3 api-build ─┐
//! 4 binary-a, binary-b (independent)               │
//! 5 config-gen (independent)                       │
//! 6 restart ───────────────────────────────────────┴─> 7 frontend
//! ```
//!
//! Stage 6 ends the run early, successfully, when no managed service is running.
//! Stage 7 waits for the API service to become ready before regenerating the
//! front-end client and restarting the front end.

use super::config::PipelineConfig;
use super::readiness::{wait_until_ready, ReadinessError};
use super::runner::{RunState, StageRunner};
use super::stage::{ActionOutcome, Stage, StageGroup, StageId, StageNode};
use crate::diagnostics::DiagnosticStore;
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use crate::report::{FailureKind, Phase, RebuildReport, ReportError, ToolOutput};
use crate::services::{Builder, ConfigGenerator, ServiceLifecycle};
use crate::settings::Settings;
use futures_util::FutureExt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Note recorded on the restart step when the stack is down
pub const SERVICES_NOT_RUNNING: &str = "services not running — skipped";

const RESTART_SERVICE_LABEL: &str = "services";

/// Upper bound of step results one run produces
pub const STAGE_COUNT: usize = 8;

#[derive(Debug, Error)]
pub enum RebuildError {
    #[error("{failed} of {total} rebuild steps failed")]
    StepsFailed {
        failed: usize,
        total: usize,
        report: Box<RebuildReport>,
    },

    #[error("Rebuild cancelled")]
    Cancelled { report: Box<RebuildReport> },

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

impl RebuildError {
    /// The finalized report, when the run got far enough to produce one
    pub fn report(&self) -> Option<&RebuildReport> {
        match self {
            RebuildError::StepsFailed { report, .. } | RebuildError::Cancelled { report } => {
                Some(&**report)
            }
            RebuildError::Report(_) => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RebuildError::Cancelled { .. })
    }
}

/// Service names the stages are recorded under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackLayout {
    pub schemas: String,
    pub primary: String,
    pub api: String,
    pub binaries: [String; 2],
    pub config: String,
    pub frontend: String,
}

impl StackLayout {
    pub fn from_settings(settings: &Settings) -> Self {
        let c = &settings.components;
        let binary = |i: usize| {
            c.binaries
                .get(i)
                .map(|b| b.name.clone())
                .unwrap_or_else(|| format!("binary-{}", i + 1))
        };
        Self {
            schemas: c.schemas.name.clone(),
            primary: c.primary.name.clone(),
            api: c.api.name.clone(),
            binaries: [binary(0), binary(1)],
            config: c.config.name.clone(),
            frontend: c.frontend.name.clone(),
        }
    }
}

impl Default for StackLayout {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

pub struct RebuildPipeline {
    builder: Arc<dyn Builder>,
    lifecycle: Arc<dyn ServiceLifecycle>,
    config_generator: Arc<dyn ConfigGenerator>,
    store: Arc<dyn DiagnosticStore>,
    progress: Arc<dyn ProgressHandler>,
    layout: StackLayout,
    config: PipelineConfig,
}

impl RebuildPipeline {
    pub fn new(
        builder: Arc<dyn Builder>,
        lifecycle: Arc<dyn ServiceLifecycle>,
        config_generator: Arc<dyn ConfigGenerator>,
        store: Arc<dyn DiagnosticStore>,
    ) -> Self {
        Self {
            builder,
            lifecycle,
            config_generator,
            store,
            progress: Arc::new(NoOpHandler),
            layout: StackLayout::default(),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_layout(mut self, layout: StackLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs every stage, finalizes and saves the report
    ///
    /// Returns the report when every step succeeded. Otherwise the error carries the
    /// finalized report with the full per-step picture.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RebuildReport, RebuildError> {
        let start = Instant::now();
        let mut report = RebuildReport::new();
        info!(run = %report.run_id, policy = ?self.config.policy, "Starting rebuild");
        self.progress.on_progress(&ProgressEvent::RunStarted {
            run_id: report.run_id.clone(),
            stages: STAGE_COUNT,
        });

        let runner = StageRunner::new(self.config.policy, cancel.clone(), self.progress.as_ref());
        let state = runner.run(self.plan(&cancel), &mut report).await?;
        if state == RunState::Cancelled {
            report.mark_cancelled();
        }

        let summary = report.finalize()?;
        self.persist(&report);
        self.progress.on_progress(&ProgressEvent::Completed {
            failed: summary.failed,
            total: summary.total,
            total_time: start.elapsed(),
        });

        if state == RunState::Cancelled {
            Err(RebuildError::Cancelled {
                report: Box::new(report),
            })
        } else if summary.failed > 0 {
            Err(RebuildError::StepsFailed {
                failed: summary.failed,
                total: summary.total,
                report: Box::new(report),
            })
        } else {
            Ok(report)
        }
    }

    fn persist(&self, report: &RebuildReport) {
        match self.store.save(report) {
            Ok(path) => self.progress.on_progress(&ProgressEvent::ReportSaved {
                path: path.display().to_string(),
            }),
            Err(e) => {
                warn!(run = %report.run_id, error = %e, "Report not saved");
                self.progress.on_progress(&ProgressEvent::ReportSaveFailed {
                    error: e.to_string(),
                });
            }
        }
    }

    fn plan<'a>(&'a self, cancel: &CancellationToken) -> Vec<StageGroup<'a>> {
        let l = &self.layout;
        let builder = self.builder.as_ref();
        let cancel = cancel.clone();

        vec![
            StageGroup::single(Stage::new(
                StageNode::new(StageId::SchemaGen, Phase::ProtoGen, &l.schemas),
                async move { ActionOutcome::from(builder.regenerate_schemas().await) }.boxed(),
            )),
            StageGroup::single(Stage::new(
                StageNode::new(StageId::PrimaryBuild, Phase::Build, &l.primary)
                    .after(StageId::SchemaGen, "schema generation failure"),
                async move { ActionOutcome::from(builder.build_primary().await) }.boxed(),
            )),
            StageGroup::single(Stage::new(
                StageNode::new(StageId::ApiBuild, Phase::Build, &l.api)
                    .after(StageId::PrimaryBuild, "primary build failure"),
                async move { ActionOutcome::from(builder.build_api().await) }.boxed(),
            )),
            StageGroup::independent(vec![
                Stage::new(
                    StageNode::new(StageId::BinaryA, Phase::Build, &l.binaries[0]),
                    async move { ActionOutcome::from(builder.build_binary(&l.binaries[0]).await) }
                        .boxed(),
                ),
                Stage::new(
                    StageNode::new(StageId::BinaryB, Phase::Build, &l.binaries[1]),
                    async move { ActionOutcome::from(builder.build_binary(&l.binaries[1]).await) }
                        .boxed(),
                ),
            ]),
            StageGroup::single(Stage::new(
                StageNode::new(StageId::ConfigGen, Phase::ConfigGen, &l.config),
                async move { ActionOutcome::from(self.config_generator.generate().await) }.boxed(),
            )),
            StageGroup::single(Stage::new(
                StageNode::new(StageId::Restart, Phase::Restart, RESTART_SERVICE_LABEL),
                self.restart_services().boxed(),
            )),
            StageGroup::single(Stage::new(
                StageNode::new(StageId::Frontend, Phase::FrontendGen, &l.frontend)
                    .after(StageId::Restart, "restart failure")
                    .after(StageId::ApiBuild, "API build failure"),
                self.refresh_frontend(cancel).boxed(),
            )),
        ]
    }

    async fn restart_services(&self) -> ActionOutcome {
        match self.lifecycle.are_running().await {
            Ok(false) => ActionOutcome::Halt {
                note: SERVICES_NOT_RUNNING.to_string(),
            },
            Ok(true) => ActionOutcome::from(
                self.lifecycle
                    .restart_all(self.config.verbose_restart)
                    .await,
            ),
            Err(e) => ActionOutcome::Failed {
                kind: FailureKind::ToolFailure,
                message: format!("Failed to query service state: {}", e.message),
                output: e.output,
            },
        }
    }

    async fn refresh_frontend(&self, cancel: CancellationToken) -> ActionOutcome {
        let api = &self.layout.api;
        self.progress.on_progress(&ProgressEvent::WaitingForReadiness {
            service: api.clone(),
            timeout: self.config.ready_timeout,
        });

        match wait_until_ready(
            self.lifecycle.as_ref(),
            api,
            self.config.ready_timeout,
            self.config.poll_interval,
            &cancel,
        )
        .await
        {
            Ok(()) => {}
            Err(ReadinessError::Cancelled(_)) => return ActionOutcome::cancelled(),
            Err(e @ ReadinessError::TimedOut { .. }) => {
                return ActionOutcome::Failed {
                    kind: FailureKind::ReadinessTimeout,
                    message: e.to_string(),
                    output: ToolOutput::default(),
                }
            }
        }

        let mut output = match self.builder.regenerate_frontend_client().await {
            Ok(output) => output,
            Err(e) => return ActionOutcome::from(Err::<ToolOutput, _>(e)),
        };

        match self.lifecycle.restart(&self.layout.frontend).await {
            Ok(more) => {
                output.append(more);
                ActionOutcome::Succeeded { output, note: None }
            }
            Err(e) => {
                output.append(e.output);
                ActionOutcome::Failed {
                    kind: FailureKind::ToolFailure,
                    message: e.message,
                    output,
                }
            }
        }
    }
}
