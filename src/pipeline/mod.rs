pub mod config;
pub mod readiness;
pub mod rebuild;
pub mod runner;
pub mod stage;

pub use config::{ExecutionPolicy, PipelineConfig};
pub use readiness::{wait_until_ready, ReadinessError};
pub use rebuild::{RebuildError, RebuildPipeline, StackLayout, SERVICES_NOT_RUNNING};
pub use runner::{RunState, StageRunner};
pub use stage::{ActionOutcome, Dependency, Stage, StageGroup, StageId, StageNode};
