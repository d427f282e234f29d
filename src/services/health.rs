use super::ToolError;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP readiness probe against per-service health URLs
///
/// A service is ready when its URL answers with a 2xx status within the probe timeout.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    http: reqwest::Client,
    health_urls: HashMap<String, String>,
}

impl HealthProbe {
    pub fn new(health_urls: HashMap<String, String>) -> Result<Self, ToolError> {
        // health URLs point at the local stack
        let http = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .no_proxy()
            .build()
            .map_err(|e| ToolError::new(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, health_urls })
    }

    pub fn has_url(&self, service: &str) -> bool {
        self.health_urls.contains_key(service)
    }

    /// `None` when no health URL is configured for `service`
    pub async fn probe(&self, service: &str) -> Option<bool> {
        let url = self.health_urls.get(service)?;
        let ready = match self.http.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(service, error = %e, "Health probe failed");
                false
            }
        };
        Some(ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn probe_for(url: &str) -> HealthProbe {
        let mut urls = HashMap::new();
        urls.insert("gateway".to_string(), url.to_string());
        HealthProbe::new(urls).unwrap()
    }

    /// Serves a single HTTP response with `status` then closes
    async fn one_shot_server(status: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{}/healthz", addr)
    }

    #[tokio::test]
    async fn test_health_url_ready() {
        let url = one_shot_server("200 OK").await;
        assert_eq!(probe_for(&url).probe("gateway").await, Some(true));
    }

    #[tokio::test]
    async fn test_health_url_unhealthy_status() {
        let url = one_shot_server("503 Service Unavailable").await;
        assert_eq!(probe_for(&url).probe("gateway").await, Some(false));
    }

    #[tokio::test]
    async fn test_health_url_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = format!("http://{}/healthz", addr);
        assert_eq!(probe_for(&url).probe("gateway").await, Some(false));
    }

    #[tokio::test]
    async fn test_unconfigured_service_has_no_answer() {
        let probe = probe_for("http://127.0.0.1:1/healthz");
        assert!(!probe.has_url("web"));
        assert_eq!(probe.probe("web").await, None);
    }
}
