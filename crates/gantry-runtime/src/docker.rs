//! Docker Engine API implementation of the runtime client.
//!
//! Talks plain HTTP to each host's Docker daemon (default port 2375).
//! Only the handful of endpoints the orchestrator needs are wrapped;
//! request and response bodies follow the Engine API's PascalCase JSON.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::client::{APP_PORT, ContainerSpec, ContainerSummary, RuntimeClient, RuntimeFactory};
use crate::error::{RuntimeError, RuntimeResult};

/// Default port the Docker daemon listens on.
pub const DEFAULT_DOCKER_PORT: u16 = 2375;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Split `name:tag`, defaulting the tag to `latest`.
pub fn split_image(image: &str) -> (&str, &str) {
    match image.split_once(':') {
        Some((name, tag)) if !tag.is_empty() => (name, tag),
        Some((name, _)) => (name, "latest"),
        None => (image, "latest"),
    }
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(rename = "Id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct ContainerEntry {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "Ports", default)]
    ports: Vec<PortEntry>,
}

#[derive(Debug, Deserialize)]
struct PortEntry {
    #[serde(rename = "PublicPort")]
    public_port: Option<u16>,
}

impl From<ContainerEntry> for ContainerSummary {
    fn from(entry: ContainerEntry) -> Self {
        ContainerSummary {
            id: entry.id,
            image: entry.image,
            ports: entry.ports.iter().filter_map(|p| p.public_port).collect(),
        }
    }
}

/// Runtime client for one host's Docker daemon.
pub struct DockerClient {
    host: String,
    docker_port: u16,
    http: reqwest::Client,
}

impl DockerClient {
    fn url(&self, path: &str) -> String {
        format!("http://{}:{}/{path}", self.host, self.docker_port)
    }

    fn api_err(&self, op: &'static str, message: impl ToString) -> RuntimeError {
        RuntimeError::Api {
            host: self.host.clone(),
            op,
            message: message.to_string(),
        }
    }

    async fn check_status(
        &self,
        op: &'static str,
        response: reqwest::Response,
    ) -> RuntimeResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(self.api_err(op, format!("status {status}: {body}")))
        }
    }
}

#[async_trait]
impl RuntimeClient for DockerClient {
    fn host(&self) -> &str {
        &self.host
    }

    async fn pull_image(&self, image: &str) -> RuntimeResult<()> {
        let (name, tag) = split_image(image);
        debug!(host = %self.host, image, "pulling image");
        let response = self
            .http
            .post(self.url("images/create"))
            .query(&[("fromImage", name), ("tag", tag)])
            .send()
            .await
            .map_err(|e| self.api_err("pull_image", e))?;
        self.check_status("pull_image", response).await?;
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        let exposed = format!("{APP_PORT}/tcp");
        let body = serde_json::json!({
            "Hostname": "",
            "User": "",
            "AttachStdin": false,
            "AttachStdout": true,
            "AttachStderr": true,
            "Tty": true,
            "OpenStdin": false,
            "StdinOnce": false,
            "Env": spec.env,
            "Cmd": null,
            "Image": spec.image,
            "Volumes": {},
            "ExposedPorts": { exposed: {} },
        });
        let response = self
            .http
            .post(self.url("containers/create"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.api_err("create_container", e))?;
        let created: CreateResponse = self
            .check_status("create_container", response)
            .await?
            .json()
            .await
            .map_err(|e| self.api_err("create_container", e))?;
        debug!(host = %self.host, id = %created.id, "container created");
        Ok(created.id)
    }

    async fn start_container(&self, id: &str, host_port: u16) -> RuntimeResult<()> {
        let binding = format!("{APP_PORT}/tcp");
        let body = serde_json::json!({
            "PortBindings": { binding: [{ "HostPort": host_port.to_string() }] },
        });
        let response = self
            .http
            .post(self.url(&format!("containers/{id}/start")))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.api_err("start_container", e))?;
        self.check_status("start_container", response).await?;
        Ok(())
    }

    async fn list_containers(&self) -> RuntimeResult<Vec<ContainerSummary>> {
        let response = self
            .http
            .get(self.url("containers/json"))
            .send()
            .await
            .map_err(|e| self.api_err("list_containers", e))?;
        let entries: Vec<ContainerEntry> = self
            .check_status("list_containers", response)
            .await?
            .json()
            .await
            .map_err(|e| self.api_err("list_containers", e))?;
        Ok(entries.into_iter().map(ContainerSummary::from).collect())
    }

    async fn inspect_container(&self, id: &str) -> RuntimeResult<serde_json::Value> {
        let response = self
            .http
            .get(self.url(&format!("containers/{id}/json")))
            .send()
            .await
            .map_err(|e| self.api_err("inspect_container", e))?;
        self.check_status("inspect_container", response)
            .await?
            .json()
            .await
            .map_err(|e| self.api_err("inspect_container", e))
    }

    async fn stop_container(&self, id: &str) -> RuntimeResult<()> {
        let response = self
            .http
            .post(self.url(&format!("containers/{id}/stop")))
            .send()
            .await
            .map_err(|e| self.api_err("stop_container", e))?;
        self.check_status("stop_container", response).await?;
        Ok(())
    }

    async fn fetch_logs(&self, id: &str) -> RuntimeResult<String> {
        let response = self
            .http
            .get(self.url(&format!("containers/{id}/logs")))
            .query(&[("stdout", "1"), ("stderr", "1")])
            .send()
            .await
            .map_err(|e| self.api_err("fetch_logs", e))?;
        self.check_status("fetch_logs", response)
            .await?
            .text()
            .await
            .map_err(|e| self.api_err("fetch_logs", e))
    }
}

/// Builds per-host [`DockerClient`]s sharing one HTTP connection pool.
pub struct DockerFactory {
    docker_port: u16,
    http: reqwest::Client,
}

impl DockerFactory {
    pub fn new(docker_port: u16) -> RuntimeResult<Self> {
        Self::with_timeout(docker_port, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(docker_port: u16, timeout: Duration) -> RuntimeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RuntimeError::Api {
                host: String::new(),
                op: "client_init",
                message: e.to_string(),
            })?;
        Ok(Self { docker_port, http })
    }
}

impl RuntimeFactory for DockerFactory {
    fn client_for(&self, host: &str) -> Arc<dyn RuntimeClient> {
        Arc::new(DockerClient {
            host: host.to_string(),
            docker_port: self.docker_port,
            http: self.http.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_image_with_tag() {
        assert_eq!(split_image("app:v1"), ("app", "v1"));
        assert_eq!(split_image("registry.local/team/app:1.2"), ("registry.local/team/app", "1.2"));
    }

    #[test]
    fn split_image_defaults_to_latest() {
        assert_eq!(split_image("app"), ("app", "latest"));
    }

    #[test]
    fn split_image_drops_a_trailing_colon() {
        assert_eq!(split_image("app:"), ("app", "latest"));
    }

    #[test]
    fn container_entry_maps_published_ports() {
        let json = r#"[
            {"Id": "abc123", "Image": "app:v1",
             "Ports": [{"PrivatePort": 3000, "PublicPort": 8042, "Type": "tcp"}]},
            {"Id": "def456", "Image": "app:v1",
             "Ports": [{"PrivatePort": 3000, "Type": "tcp"}]},
            {"Id": "ghi789", "Image": "other:2"}
        ]"#;
        let entries: Vec<ContainerEntry> = serde_json::from_str(json).unwrap();
        let summaries: Vec<ContainerSummary> =
            entries.into_iter().map(ContainerSummary::from).collect();

        assert_eq!(summaries[0].id, "abc123");
        assert_eq!(summaries[0].ports, vec![8042]);
        // Unpublished ports are dropped, missing Ports arrays tolerated.
        assert!(summaries[1].ports.is_empty());
        assert!(summaries[2].ports.is_empty());
    }

    #[test]
    fn factory_builds_client_for_host() {
        let factory = DockerFactory::new(DEFAULT_DOCKER_PORT).unwrap();
        let client = factory.client_for("10.0.0.1");
        assert_eq!(client.host(), "10.0.0.1");
    }

    #[test]
    fn docker_url_includes_host_and_port() {
        let docker = DockerClient {
            host: "10.0.0.1".to_string(),
            docker_port: 2375,
            http: reqwest::Client::new(),
        };
        assert_eq!(
            docker.url("containers/json"),
            "http://10.0.0.1:2375/containers/json"
        );
    }
}
