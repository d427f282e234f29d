//! External collaborators driven by the rebuild pipeline
//!
//! The pipeline only sees these traits. [`ShellBuilder`] and [`DockerLifecycle`] are the
//! default adapters wired up from [`Settings`](crate::settings::Settings); tests inject fakes.

mod docker;
mod health;
mod shell;

pub use docker::DockerLifecycle;
pub use health::HealthProbe;
pub use shell::{ShellBuilder, ShellConfigGenerator};

use crate::report::ToolOutput;
use async_trait::async_trait;
use thiserror::Error;

/// Failed external action, carrying whatever it printed
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ToolError {
    pub message: String,
    pub output: ToolOutput,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            output: ToolOutput::default(),
        }
    }

    pub fn with_output(message: impl Into<String>, output: ToolOutput) -> Self {
        Self {
            message: message.into(),
            output,
        }
    }
}

pub type ToolResult = Result<ToolOutput, ToolError>;

/// Build and code-generation actions for each stack component
#[async_trait]
pub trait Builder: Send + Sync {
    /// Regenerates the shared upstream schemas
    async fn regenerate_schemas(&self) -> ToolResult;

    async fn build_primary(&self) -> ToolResult;

    /// Regenerates the API protos and rebuilds the API binary
    async fn build_api(&self) -> ToolResult;

    /// Builds one of the independent binaries
    async fn build_binary(&self, name: &str) -> ToolResult;

    async fn regenerate_frontend_client(&self) -> ToolResult;
}

/// Lifecycle of the running stack
#[async_trait]
pub trait ServiceLifecycle: Send + Sync {
    /// Whether any managed service is currently running
    async fn are_running(&self) -> Result<bool, ToolError>;

    /// Restarts every managed service, network by network
    async fn restart_all(&self, verbose: bool) -> ToolResult;

    /// Single readiness probe; the pipeline does the polling
    async fn is_ready(&self, service: &str) -> bool;

    async fn restart(&self, service: &str) -> ToolResult;
}

/// Produces the merged runtime configuration
#[async_trait]
pub trait ConfigGenerator: Send + Sync {
    async fn generate(&self) -> ToolResult;
}
