//! Stack settings
//!
//! Settings are read from a YAML file and then overridden by environment variables.
//! Every field has a default, so an empty file (or no file at all) describes the
//! standard stack layout.
//!
//! # Environment Variables
//!
//! - `DEVSTACK_SETTINGS`: settings file path - default: `./devstack.yaml` when present
//! - `DEVSTACK_WORKSPACE`: directory containing the cloned repositories
//! - `DEVSTACK_REPORT_DIR`: where rebuild reports are saved - default: local data dir
//! - `DEVSTACK_READY_TIMEOUT`: API readiness timeout in seconds - default: "120"
//! - `DEVSTACK_LOG_LEVEL`: logging level - default: "info"

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const DEFAULT_SETTINGS_FILE: &str = "devstack.yaml";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_READY_TIMEOUT_SECS: u64 = 120;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// One buildable piece of the stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Service name; also the container name for runnable components
    pub name: String,
    /// Shell command performing the build or generation
    pub command: String,
    /// Working directory, relative to the workspace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
}

impl Component {
    pub fn new(name: &str, command: &str, workdir: &str) -> Self {
        Self {
            name: name.to_string(),
            command: command.to_string(),
            workdir: Some(PathBuf::from(workdir)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Components {
    pub schemas: Component,
    pub primary: Component,
    pub api: Component,
    /// Exactly two binaries with no dependency on the schema chain
    pub binaries: Vec<Component>,
    pub config: Component,
    pub frontend: Component,
}

impl Default for Components {
    fn default() -> Self {
        Self {
            schemas: Component::new("schemas", "make proto", "schemas"),
            primary: Component::new("core", "make build", "core"),
            api: Component::new("gateway", "make proto && make build", "gateway"),
            binaries: vec![
                Component::new("indexer", "make build", "indexer"),
                Component::new("worker", "make build", "worker"),
            ],
            config: Component::new("config", "make config", "deploy"),
            frontend: Component::new("web", "npm run generate:client", "web"),
        }
    }
}

/// Services to restart on one container network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    pub name: String,
    pub services: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessSettings {
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Health endpoint per service; services without one are ready once running
    pub health_urls: HashMap<String, String>,
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        let mut health_urls = HashMap::new();
        health_urls.insert(
            "gateway".to_string(),
            "http://localhost:8080/healthz".to_string(),
        );
        Self {
            timeout_secs: DEFAULT_READY_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            health_urls,
        }
    }
}

impl ReadinessSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub workspace: PathBuf,
    pub components: Components,
    pub networks: Vec<NetworkSettings>,
    pub readiness: ReadinessSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("."),
            components: Components::default(),
            networks: vec![
                NetworkSettings {
                    name: "devstack-data".to_string(),
                    services: vec!["postgres".to_string(), "redis".to_string()],
                },
                NetworkSettings {
                    name: "devstack-app".to_string(),
                    services: vec![
                        "core".to_string(),
                        "gateway".to_string(),
                        "indexer".to_string(),
                        "worker".to_string(),
                    ],
                },
            ],
            readiness: ReadinessSettings::default(),
            report_dir: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, `DEVSTACK_SETTINGS`, or `./devstack.yaml`, then applies
    /// environment overrides and validates
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| env::var("DEVSTACK_SETTINGS").ok().map(PathBuf::from));

        let mut settings = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_SETTINGS_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!("No settings file found, using defaults");
                    Self::default()
                }
            }
        };

        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(workspace) = env::var("DEVSTACK_WORKSPACE") {
            self.workspace = PathBuf::from(workspace);
        }
        if let Ok(dir) = env::var("DEVSTACK_REPORT_DIR") {
            self.report_dir = Some(PathBuf::from(dir));
        }
        if let Ok(timeout) = env::var("DEVSTACK_READY_TIMEOUT") {
            self.readiness.timeout_secs =
                timeout.parse().map_err(|e| ConfigError::ParseError {
                    field: "DEVSTACK_READY_TIMEOUT".to_string(),
                    error: format!("{}", e),
                })?;
        }
        if let Ok(level) = env::var("DEVSTACK_LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.components;
        for component in [&c.schemas, &c.primary, &c.api, &c.config, &c.frontend]
            .into_iter()
            .chain(c.binaries.iter())
        {
            if component.name.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "component name cannot be empty".to_string(),
                ));
            }
            if component.command.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "component '{}' has an empty command",
                    component.name
                )));
            }
        }

        if c.binaries.len() != 2 {
            return Err(ConfigError::ValidationFailed(format!(
                "expected exactly 2 independent binaries, got {}",
                c.binaries.len()
            )));
        }
        if c.binaries[0].name == c.binaries[1].name {
            return Err(ConfigError::ValidationFailed(format!(
                "independent binaries must be distinct, both are named '{}'",
                c.binaries[0].name
            )));
        }

        if self.networks.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "at least one network must be configured".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for network in &self.networks {
            if !seen.insert(network.name.as_str()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "network '{}' is listed twice",
                    network.name
                )));
            }
        }

        if self.readiness.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "readiness poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Every managed service across networks, first occurrence order
    pub fn managed_services(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.networks
            .iter()
            .flat_map(|n| n.services.iter())
            .map(String::as_str)
            .filter(|s| seen.insert(*s))
            .collect()
    }

    pub fn resolve_workdir(&self, component: &Component) -> PathBuf {
        match component.workdir {
            Some(ref dir) => self.workspace.join(dir),
            None => self.workspace.clone(),
        }
    }
}
