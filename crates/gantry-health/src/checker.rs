//! Health gate — bounded retry loop over the liveness probe.
//!
//! The orchestrator only ever sees the final boolean: transport errors
//! during retries are expected transient noise while a container boots
//! and are swallowed on purpose. The first response that actually
//! arrives settles the outcome, healthy or not.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::probe::{ProbeResult, http_probe};

/// Boolean liveness gate for a `host:port` instance.
#[async_trait]
pub trait HealthGate: Send + Sync {
    /// Poll the instance until it reports healthy or retries run out.
    async fn wait_for_healthy(&self, host: &str, port: u16) -> bool;
}

/// HTTP health checker with fixed inter-attempt delay.
#[derive(Debug, Clone)]
pub struct HealthChecker {
    /// Maximum probe attempts before giving up.
    pub attempts: u32,
    /// Fixed delay before each attempt (containers need boot time).
    pub delay: Duration,
    /// Per-attempt probe timeout.
    pub timeout: Duration,
    /// Liveness path on the instance.
    pub path: String,
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_secs(2),
            timeout: Duration::from_secs(2),
            path: "/ping".to_string(),
        }
    }
}

impl HealthChecker {
    /// Retry loop over an arbitrary prober. Factored out so the policy is
    /// testable without sockets.
    pub(crate) async fn run_with<F, Fut>(&self, probe: F) -> bool
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ProbeResult>,
    {
        for attempt in 1..=self.attempts {
            tokio::time::sleep(self.delay).await;
            match probe().await {
                ProbeResult::Healthy => {
                    debug!(attempt, "instance healthy");
                    return true;
                }
                // The endpoint answered; its verdict is final.
                ProbeResult::Unhealthy => {
                    warn!(attempt, "instance responded non-2xx");
                    return false;
                }
                ProbeResult::Failed => {
                    debug!(attempt, "instance not yet reachable");
                }
            }
        }
        warn!(attempts = self.attempts, "health check exhausted retries");
        false
    }
}

#[async_trait]
impl HealthGate for HealthChecker {
    async fn wait_for_healthy(&self, host: &str, port: u16) -> bool {
        let address = format!("{host}:{port}");
        self.run_with(|| http_probe(&address, &self.path, self.timeout))
            .await
    }
}
