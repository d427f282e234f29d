//! Shared fakes for pipeline integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use devstack::diagnostics::{DiagnosticStore, StoreError};
use devstack::pipeline::{PipelineConfig, RebuildPipeline};
use devstack::progress::{ProgressEvent, ProgressHandler};
use devstack::report::{RebuildReport, ToolOutput};
use devstack::services::{Builder, ConfigGenerator, ServiceLifecycle, ToolError, ToolResult};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Builder whose actions succeed unless a failure was scripted for them
#[derive(Default)]
pub struct FakeBuilder {
    failures: HashMap<String, ToolError>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl FakeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts `action` to fail with `stderr` as its captured output
    ///
    /// Action names: `schemas`, `primary`, `api`, `frontend-client`, or a binary name.
    pub fn failing(mut self, action: &str, stderr: &str) -> Self {
        self.failures.insert(
            action.to_string(),
            ToolError::with_output(
                format!("{} failed: exit status 1", action),
                ToolOutput::new("", stderr),
            ),
        );
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn act(&self, action: &str) -> ToolResult {
        self.calls.lock().unwrap().push(action.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.get(action) {
            Some(err) => Err(err.clone()),
            None => Ok(ToolOutput::new(format!("{} ok", action), "")),
        }
    }
}

#[async_trait]
impl Builder for FakeBuilder {
    async fn regenerate_schemas(&self) -> ToolResult {
        self.act("schemas").await
    }

    async fn build_primary(&self) -> ToolResult {
        self.act("primary").await
    }

    async fn build_api(&self) -> ToolResult {
        self.act("api").await
    }

    async fn build_binary(&self, name: &str) -> ToolResult {
        self.act(name).await
    }

    async fn regenerate_frontend_client(&self) -> ToolResult {
        self.act("frontend-client").await
    }
}

/// Lifecycle with scripted running state, restart failures and readiness
pub struct FakeLifecycle {
    pub running: bool,
    pub restart_all_error: Option<String>,
    /// Probe number on which the API turns ready; `None` never does
    pub ready_on: Option<usize>,
    probes: AtomicUsize,
    restarted: Mutex<Vec<String>>,
}

impl Default for FakeLifecycle {
    fn default() -> Self {
        Self {
            running: true,
            restart_all_error: None,
            ready_on: Some(1),
            probes: AtomicUsize::new(0),
            restarted: Mutex::new(Vec::new()),
        }
    }
}

impl FakeLifecycle {
    pub fn running() -> Self {
        Self::default()
    }

    pub fn stopped() -> Self {
        Self {
            running: false,
            ..Self::default()
        }
    }

    pub fn never_ready() -> Self {
        Self {
            ready_on: None,
            ..Self::default()
        }
    }

    pub fn failing_restart(message: &str) -> Self {
        Self {
            restart_all_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn restarted(&self) -> Vec<String> {
        self.restarted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServiceLifecycle for FakeLifecycle {
    async fn are_running(&self) -> Result<bool, ToolError> {
        Ok(self.running)
    }

    async fn restart_all(&self, _verbose: bool) -> ToolResult {
        self.restarted.lock().unwrap().push("*".to_string());
        match &self.restart_all_error {
            Some(message) => Err(ToolError::with_output(
                message.clone(),
                ToolOutput::new("", message.clone()),
            )),
            None => Ok(ToolOutput::new("restarted", "")),
        }
    }

    async fn is_ready(&self, _service: &str) -> bool {
        let probe = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
        matches!(self.ready_on, Some(n) if probe >= n)
    }

    async fn restart(&self, service: &str) -> ToolResult {
        self.restarted.lock().unwrap().push(service.to_string());
        Ok(ToolOutput::new(format!("{} restarted", service), ""))
    }
}

#[derive(Default)]
pub struct FakeConfigGenerator {
    pub error: Option<String>,
}

impl FakeConfigGenerator {
    pub fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
        }
    }
}

#[async_trait]
impl ConfigGenerator for FakeConfigGenerator {
    async fn generate(&self) -> ToolResult {
        match &self.error {
            Some(message) => Err(ToolError::with_output(
                message.clone(),
                ToolOutput::new("", message.clone()),
            )),
            None => Ok(ToolOutput::new("config written", "")),
        }
    }
}

/// In-memory store; optionally refuses every save
#[derive(Default)]
pub struct MemoryStore {
    pub fail: bool,
    saved: Mutex<Vec<RebuildReport>>,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Vec<RebuildReport> {
        self.saved.lock().unwrap().clone()
    }
}

impl DiagnosticStore for MemoryStore {
    fn save(&self, report: &RebuildReport) -> Result<PathBuf, StoreError> {
        if self.fail {
            return Err(StoreError::Io {
                path: PathBuf::from("/nonexistent/reports"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.saved.lock().unwrap().push(report.clone());
        Ok(PathBuf::from(format!("memory://{}", report.run_id)))
    }
}

/// Progress handler that keeps every event for later assertions
#[derive(Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingHandler {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressHandler for RecordingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Collaborators for one pipeline under test
pub struct Harness {
    pub builder: Arc<FakeBuilder>,
    pub lifecycle: Arc<FakeLifecycle>,
    pub config_generator: Arc<FakeConfigGenerator>,
    pub store: Arc<MemoryStore>,
    pub progress: Arc<RecordingHandler>,
}

impl Harness {
    pub fn new(builder: FakeBuilder, lifecycle: FakeLifecycle) -> Self {
        Self {
            builder: Arc::new(builder),
            lifecycle: Arc::new(lifecycle),
            config_generator: Arc::new(FakeConfigGenerator::default()),
            store: Arc::new(MemoryStore::default()),
            progress: Arc::new(RecordingHandler::default()),
        }
    }

    pub fn with_config_generator(mut self, generator: FakeConfigGenerator) -> Self {
        self.config_generator = Arc::new(generator);
        self
    }

    pub fn with_store(mut self, store: MemoryStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Pipeline with short readiness timings
    pub fn pipeline(&self) -> RebuildPipeline {
        self.pipeline_with(fast_config())
    }

    pub fn pipeline_with(&self, config: PipelineConfig) -> RebuildPipeline {
        RebuildPipeline::new(
            self.builder.clone(),
            self.lifecycle.clone(),
            self.config_generator.clone(),
            self.store.clone(),
        )
        .with_progress(self.progress.clone())
        .with_config(config)
    }
}

pub fn fast_config() -> PipelineConfig {
    PipelineConfig::new()
        .with_ready_timeout(Duration::from_millis(200))
        .with_poll_interval(Duration::from_millis(10))
}
