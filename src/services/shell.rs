use super::{Builder, ConfigGenerator, ToolError, ToolResult};
use crate::report::ToolOutput;
use crate::settings::{Component, Settings};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

/// Runs each component's configured command through `sh -c`
///
/// Child processes are killed when their future is dropped, so cancelling a stage also
/// stops the compiler or generator it started.
#[derive(Debug, Clone)]
pub struct ShellBuilder {
    settings: Arc<Settings>,
}

impl ShellBuilder {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    async fn run_component(&self, component: &Component) -> ToolResult {
        let workdir = self.settings.resolve_workdir(component);
        run_shell(&component.name, &component.command, &workdir).await
    }
}

#[async_trait]
impl Builder for ShellBuilder {
    async fn regenerate_schemas(&self) -> ToolResult {
        self.run_component(&self.settings.components.schemas).await
    }

    async fn build_primary(&self) -> ToolResult {
        self.run_component(&self.settings.components.primary).await
    }

    async fn build_api(&self) -> ToolResult {
        self.run_component(&self.settings.components.api).await
    }

    async fn build_binary(&self, name: &str) -> ToolResult {
        let component = self
            .settings
            .components
            .binaries
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ToolError::new(format!("Unknown binary '{}'", name)))?;
        self.run_component(component).await
    }

    async fn regenerate_frontend_client(&self) -> ToolResult {
        self.run_component(&self.settings.components.frontend).await
    }
}

/// Runs the configured configuration-generation command
#[derive(Debug, Clone)]
pub struct ShellConfigGenerator {
    settings: Arc<Settings>,
}

impl ShellConfigGenerator {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ConfigGenerator for ShellConfigGenerator {
    async fn generate(&self) -> ToolResult {
        let component = &self.settings.components.config;
        let workdir = self.settings.resolve_workdir(component);
        run_shell(&component.name, &component.command, &workdir).await
    }
}

pub(crate) async fn run_shell(label: &str, command: &str, workdir: &Path) -> ToolResult {
    info!(component = label, command, workdir = %workdir.display(), "Running command");

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(workdir)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ToolError::new(format!("Failed to spawn `{}` for {}: {}", command, label, e)))?;

    let captured = ToolOutput::new(
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    );

    if output.status.success() {
        debug!(component = label, "Command succeeded");
        Ok(captured)
    } else {
        let status = match output.status.code() {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        };
        Err(ToolError::with_output(
            format!("`{}` failed for {}: {}", command, label, status),
            captured,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Component;
    use tempfile::TempDir;

    fn settings_in(dir: &Path) -> Arc<Settings> {
        let mut settings = Settings::default();
        settings.workspace = dir.to_path_buf();
        settings.components.primary = Component {
            name: "core".to_string(),
            command: "echo building; echo 'undefined: Foo' >&2; exit 2".to_string(),
            workdir: None,
        };
        settings.components.binaries[0] = Component {
            name: "indexer".to_string(),
            command: "echo indexed".to_string(),
            workdir: None,
        };
        Arc::new(settings)
    }

    #[tokio::test]
    async fn test_success_captures_stdout() {
        let dir = TempDir::new().unwrap();
        let builder = ShellBuilder::new(settings_in(dir.path()));
        let output = builder.build_binary("indexer").await.unwrap();
        assert_eq!(output.stdout.trim(), "indexed");
    }

    #[tokio::test]
    async fn test_failure_keeps_output_and_status() {
        let dir = TempDir::new().unwrap();
        let builder = ShellBuilder::new(settings_in(dir.path()));
        let err = builder.build_primary().await.unwrap_err();
        assert!(err.message.contains("exit status 2"));
        assert_eq!(err.output.stdout.trim(), "building");
        assert_eq!(err.output.stderr.trim(), "undefined: Foo");
    }

    #[tokio::test]
    async fn test_unknown_binary() {
        let dir = TempDir::new().unwrap();
        let builder = ShellBuilder::new(settings_in(dir.path()));
        let err = builder.build_binary("nope").await.unwrap_err();
        assert!(err.message.contains("Unknown binary"));
    }

    #[tokio::test]
    async fn test_missing_workdir_is_tool_error() {
        let builder = ShellBuilder::new(settings_in(Path::new("/nonexistent/devstack")));
        assert!(builder.build_binary("indexer").await.is_err());
    }
}
