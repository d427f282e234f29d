//! devstack - dependency-ordered rebuilds of a local development stack
//!
//! This library regenerates schemas, rebuilds binaries, regenerates configuration and
//! restarts the running services of a multi-service development environment, in an order
//! where every step only runs when the steps it depends on succeeded. Every step yields a
//! [`StepResult`]; the run yields a finalized [`RebuildReport`]. Failed steps are matched
//! against a catalog of known failure patterns to produce actionable hints.
//!
//! # Core Concepts
//!
//! - **Stages**: units of work with declared dependencies. A stage whose dependency
//!   failed is recorded as a cascaded skip instead of running.
//! - **Collaborators**: [`Builder`], [`ServiceLifecycle`] and [`ConfigGenerator`] are the
//!   seams to the outside world; the pipeline never shells out itself.
//! - **Diagnosis**: [`PatternMatcher`] scores tool output against [`ErrorPattern`]s and
//!   returns the best (or every) matching hint.
//!
//! # Example Usage
//!
//! ```ignore
//! use devstack::{PatternMatcher, RebuildPipeline};
//! use tokio_util::sync::CancellationToken;
//!
//! let pipeline = RebuildPipeline::new(builder, lifecycle, config_generator, store);
//! match pipeline.run(CancellationToken::new()).await {
//!     Ok(report) => println!("{} steps ok", report.steps().len()),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`pipeline`]: stage graph, runner, readiness wait and the rebuild plan
//! - [`report`]: step results and the aggregate report
//! - [`diagnostics`]: error patterns, the matcher and the report store
//! - [`services`]: collaborator traits and their shell/Docker adapters
//! - [`settings`]: `devstack.yaml` and environment overrides

pub mod cli;
pub mod diagnostics;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod services;
pub mod settings;
pub mod util;

pub use diagnostics::{
    Confidence, Diagnosis, DiagnosticStore, ErrorPattern, FileDiagnosticStore, PatternError,
    PatternMatcher,
};
pub use pipeline::{ExecutionPolicy, PipelineConfig, RebuildError, RebuildPipeline};
pub use report::{FailureKind, Phase, RebuildReport, StepResult, ToolOutput};
pub use services::{Builder, ConfigGenerator, ServiceLifecycle, ToolError};
pub use settings::{ConfigError, Settings};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
