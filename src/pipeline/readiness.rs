use crate::services::ServiceLifecycle;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("{service} did not become ready within {waited:?}")]
    TimedOut { service: String, waited: Duration },

    #[error("Cancelled while waiting for {0}")]
    Cancelled(String),
}

/// Polls `service` until it reports ready, the timeout expires, or the run is cancelled
///
/// Probes once immediately, then every `interval`, and a last time at the deadline. A
/// probe in flight is not cut off by the deadline; each probe is bounded by the
/// lifecycle's own request timeout.
pub async fn wait_until_ready(
    lifecycle: &dyn ServiceLifecycle,
    service: &str,
    timeout: Duration,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<(), ReadinessError> {
    let start = Instant::now();
    let deadline = start + timeout;
    let mut attempts = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(ReadinessError::Cancelled(service.to_string()));
        }

        attempts += 1;
        let ready = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReadinessError::Cancelled(service.to_string())),
            ready = lifecycle.is_ready(service) => ready,
        };
        if ready {
            debug!(service, attempts, elapsed_ms = start.elapsed().as_millis(), "Service ready");
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(ReadinessError::TimedOut {
                service: service.to_string(),
                waited: now - start,
            });
        }

        let pause = interval.min(deadline - now);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReadinessError::Cancelled(service.to_string())),
            _ = sleep(pause) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ToolError, ToolResult};
    use crate::report::ToolOutput;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ReadyAfter {
        probes: AtomicUsize,
        ready_on: usize,
    }

    #[async_trait]
    impl ServiceLifecycle for ReadyAfter {
        async fn are_running(&self) -> Result<bool, ToolError> {
            Ok(true)
        }

        async fn restart_all(&self, _verbose: bool) -> ToolResult {
            Ok(ToolOutput::default())
        }

        async fn is_ready(&self, _service: &str) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst) + 1 >= self.ready_on
        }

        async fn restart(&self, _service: &str) -> ToolResult {
            Ok(ToolOutput::default())
        }
    }

    fn lifecycle(ready_on: usize) -> ReadyAfter {
        ReadyAfter {
            probes: AtomicUsize::new(0),
            ready_on,
        }
    }

    #[tokio::test]
    async fn test_ready_after_a_few_probes() {
        let lc = lifecycle(3);
        let result = wait_until_ready(
            &lc,
            "gateway",
            Duration::from_secs(5),
            Duration::from_millis(5),
            &CancellationToken::new(),
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(lc.probes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_times_out() {
        let lc = lifecycle(usize::MAX);
        let result = wait_until_ready(
            &lc,
            "gateway",
            Duration::from_millis(40),
            Duration::from_millis(5),
            &CancellationToken::new(),
        )
        .await;
        assert!(matches!(result, Err(ReadinessError::TimedOut { ref service, .. }) if service == "gateway"));
    }

    #[tokio::test]
    async fn test_probes_once_more_at_deadline() {
        // probes at 0, 40, 80 and the deadline at 100ms
        let lc = lifecycle(4);
        let result = wait_until_ready(
            &lc,
            "gateway",
            Duration::from_millis(100),
            Duration::from_millis(40),
            &CancellationToken::new(),
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(lc.probes.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_cancel_wins() {
        let lc = lifecycle(usize::MAX);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = wait_until_ready(
            &lc,
            "gateway",
            Duration::from_secs(30),
            Duration::from_millis(5),
            &cancel,
        )
        .await;
        assert_eq!(result, Err(ReadinessError::Cancelled("gateway".to_string())));
    }
}
