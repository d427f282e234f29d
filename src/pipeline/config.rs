use crate::settings::Settings;
use std::time::Duration;

/// How mutually independent stages inside one group are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionPolicy {
    #[default]
    Sequential,
    Concurrent,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
    pub policy: ExecutionPolicy,
    pub verbose_restart: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(2),
            policy: ExecutionPolicy::Sequential,
            verbose_restart: false,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::default()
            .with_ready_timeout(settings.readiness.timeout())
            .with_poll_interval(settings.readiness.poll_interval())
    }

    pub fn with_ready_timeout(mut self, ready_timeout: Duration) -> Self {
        self.ready_timeout = ready_timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_verbose_restart(mut self, verbose_restart: bool) -> Self {
        self.verbose_restart = verbose_restart;
        self
    }
}
