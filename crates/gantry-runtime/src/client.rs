//! Runtime client capability — the narrow surface the orchestrator needs
//! from a host's container daemon.
//!
//! One client value addresses one host; clients come from a
//! [`RuntimeFactory`] keyed by host so callers never hold global state.
//! Every call is a synchronous remote call that can be slow and can fail
//! independently of other hosts.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RuntimeResult;

/// Fixed internal port the application listens on inside its container.
/// The orchestrator maps this to an allocated external port per instance.
pub const APP_PORT: u16 = 3000;

/// What to run: image plus the app's environment snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    /// `KEY=VALUE` entries.
    pub env: Vec<String>,
}

/// A container as reported by the remote runtime. This list is the ground
/// truth for which ports are in use on a host; no separate ledger exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub image: String,
    /// Externally published ports.
    pub ports: Vec<u16>,
}

/// Capability interface to one host's container daemon.
#[async_trait]
pub trait RuntimeClient: Send + Sync {
    /// The host this client addresses.
    fn host(&self) -> &str;

    /// Pull `image` onto the host.
    async fn pull_image(&self, image: &str) -> RuntimeResult<()>;

    /// Create a container from `spec`. Returns the runtime-assigned id.
    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String>;

    /// Start a created container, binding [`APP_PORT`] to `host_port`.
    async fn start_container(&self, id: &str, host_port: u16) -> RuntimeResult<()>;

    /// All running containers on the host.
    async fn list_containers(&self) -> RuntimeResult<Vec<ContainerSummary>>;

    /// Raw inspect payload for a container.
    async fn inspect_container(&self, id: &str) -> RuntimeResult<serde_json::Value>;

    /// Stop a running container.
    async fn stop_container(&self, id: &str) -> RuntimeResult<()>;

    /// Stdout+stderr logs for a container.
    async fn fetch_logs(&self, id: &str) -> RuntimeResult<String>;
}

/// Produces a per-host [`RuntimeClient`].
pub trait RuntimeFactory: Send + Sync {
    fn client_for(&self, host: &str) -> Arc<dyn RuntimeClient>;
}

/// Find the container publishing `port`, if any.
pub async fn find_container_by_port(
    client: &dyn RuntimeClient,
    port: u16,
) -> RuntimeResult<Option<ContainerSummary>> {
    let containers = client.list_containers().await?;
    Ok(containers.into_iter().find(|c| c.ports.contains(&port)))
}

/// Stop whatever container publishes `port`. A missing container is not
/// an error — the instance may already be gone.
pub async fn stop_container_by_port(client: &dyn RuntimeClient, port: u16) -> RuntimeResult<()> {
    match find_container_by_port(client, port).await? {
        Some(container) => client.stop_container(&container.id).await,
        None => Ok(()),
    }
}
