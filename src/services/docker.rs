use super::{HealthProbe, ServiceLifecycle, ToolError, ToolResult};
use crate::report::ToolOutput;
use crate::settings::Settings;
use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, RestartContainerOptions};
use bollard::errors::Error as DockerError;
use bollard::Docker;
use std::sync::Arc;
use tracing::{debug, info, warn};

const RESTART_GRACE_SECS: isize = 10;

/// Service lifecycle backed by the local Docker daemon
///
/// Containers are addressed by service name. Readiness uses the service's configured
/// health URL when there is one, otherwise the container's running state.
pub struct DockerLifecycle {
    docker: Docker,
    health: HealthProbe,
    settings: Arc<Settings>,
}

impl DockerLifecycle {
    pub fn connect(settings: Arc<Settings>) -> Result<Self, ToolError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| ToolError::new(format!("Cannot connect to the Docker daemon: {}", e)))?;
        let health = HealthProbe::new(settings.readiness.health_urls.clone())?;
        Ok(Self {
            docker,
            health,
            settings,
        })
    }

    async fn container_running(&self, name: &str) -> Result<bool, ToolError> {
        match self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
        {
            Ok(info) => Ok(info.state.and_then(|s| s.running).unwrap_or(false)),
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(ToolError::new(format!(
                "Failed to inspect container {}: {}",
                name, e
            ))),
        }
    }

    async fn restart_container(&self, name: &str) -> Result<(), DockerError> {
        self.docker
            .restart_container(
                name,
                Some(RestartContainerOptions {
                    t: RESTART_GRACE_SECS,
                }),
            )
            .await
    }
}

#[async_trait]
impl ServiceLifecycle for DockerLifecycle {
    async fn are_running(&self) -> Result<bool, ToolError> {
        for service in self.settings.managed_services() {
            if self.container_running(service).await? {
                debug!(service, "Managed service is running");
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn restart_all(&self, verbose: bool) -> ToolResult {
        let mut output = ToolOutput::default();
        let mut failures = Vec::new();

        for network in &self.settings.networks {
            info!(network = %network.name, services = network.services.len(), "Restarting network");
            for service in &network.services {
                match self.restart_container(service).await {
                    Ok(()) => {
                        if verbose {
                            output.append(ToolOutput::new(
                                format!("restarted {} ({})", service, network.name),
                                "",
                            ));
                        }
                    }
                    Err(e) => {
                        warn!(service = %service, network = %network.name, error = %e, "Restart failed");
                        output.append(ToolOutput::new("", format!("{}: {}", service, e)));
                        failures.push(service.as_str());
                    }
                }
            }
        }

        if failures.is_empty() {
            Ok(output)
        } else {
            Err(ToolError::with_output(
                format!("Failed to restart {}", failures.join(", ")),
                output,
            ))
        }
    }

    async fn is_ready(&self, service: &str) -> bool {
        match self.health.probe(service).await {
            Some(ready) => ready,
            None => self.container_running(service).await.unwrap_or(false),
        }
    }

    async fn restart(&self, service: &str) -> ToolResult {
        self.restart_container(service)
            .await
            .map(|()| ToolOutput::new(format!("restarted {}", service), ""))
            .map_err(|e| ToolError::new(format!("Failed to restart {}: {}", service, e)))
    }
}
