//! Shared fakes for orchestrator tests: an in-process cluster standing
//! in for per-host container daemons, and a fixed-outcome health gate.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use gantry_health::HealthGate;
use gantry_runtime::{
    ContainerSpec, ContainerSummary, RuntimeClient, RuntimeError, RuntimeFactory, RuntimeResult,
};

/// A container tracked by the fake cluster.
#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub image: String,
    pub env: Vec<String>,
    pub port: Option<u16>,
    pub running: bool,
}

#[derive(Default)]
struct ClusterState {
    containers: HashMap<String, Vec<FakeContainer>>,
    fail_pull: HashSet<String>,
    fail_stop: HashSet<String>,
    next_id: u32,
}

/// Fake multi-host cluster. Acts as the `RuntimeFactory`; every client
/// it hands out shares this state.
#[derive(Default)]
pub struct FakeCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_pulls_on(&self, host: &str) {
        self.state.lock().unwrap().fail_pull.insert(host.to_string());
    }

    pub fn fail_stops_on(&self, host: &str) {
        self.state.lock().unwrap().fail_stop.insert(host.to_string());
    }

    /// Plant a running container, as if some earlier deployment made it.
    pub fn seed_running(&self, host: &str, image: &str, port: u16) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("seed-{}", state.next_id);
        state
            .containers
            .entry(host.to_string())
            .or_default()
            .push(FakeContainer {
                id,
                image: image.to_string(),
                env: Vec::new(),
                port: Some(port),
                running: true,
            });
    }

    pub fn running_on(&self, host: &str) -> Vec<FakeContainer> {
        self.on_host(host, |c| c.running)
    }

    pub fn stopped_on(&self, host: &str) -> Vec<FakeContainer> {
        self.on_host(host, |c| !c.running)
    }

    fn on_host(&self, host: &str, keep: impl Fn(&FakeContainer) -> bool) -> Vec<FakeContainer> {
        self.state
            .lock()
            .unwrap()
            .containers
            .get(host)
            .map(|cs| cs.iter().filter(|c| keep(c)).cloned().collect())
            .unwrap_or_default()
    }
}

impl RuntimeFactory for FakeCluster {
    fn client_for(&self, host: &str) -> Arc<dyn RuntimeClient> {
        Arc::new(FakeClient {
            host: host.to_string(),
            state: self.state.clone(),
        })
    }
}

struct FakeClient {
    host: String,
    state: Arc<Mutex<ClusterState>>,
}

impl FakeClient {
    fn api_err(&self, op: &'static str, message: &str) -> RuntimeError {
        RuntimeError::Api {
            host: self.host.clone(),
            op,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl RuntimeClient for FakeClient {
    fn host(&self) -> &str {
        &self.host
    }

    async fn pull_image(&self, _image: &str) -> RuntimeResult<()> {
        if self.state.lock().unwrap().fail_pull.contains(&self.host) {
            return Err(self.api_err("pull_image", "registry unreachable"));
        }
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> RuntimeResult<String> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("ctr-{}", state.next_id);
        state
            .containers
            .entry(self.host.clone())
            .or_default()
            .push(FakeContainer {
                id: id.clone(),
                image: spec.image.clone(),
                env: spec.env.clone(),
                port: None,
                running: false,
            });
        Ok(id)
    }

    async fn start_container(&self, id: &str, host_port: u16) -> RuntimeResult<()> {
        let mut state = self.state.lock().unwrap();
        let container = state
            .containers
            .get_mut(&self.host)
            .and_then(|cs| cs.iter_mut().find(|c| c.id == id));
        match container {
            Some(c) => {
                c.port = Some(host_port);
                c.running = true;
                Ok(())
            }
            None => Err(self.api_err("start_container", "no such container")),
        }
    }

    async fn list_containers(&self) -> RuntimeResult<Vec<ContainerSummary>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .get(&self.host)
            .map(|cs| {
                cs.iter()
                    .filter(|c| c.running)
                    .map(|c| ContainerSummary {
                        id: c.id.clone(),
                        image: c.image.clone(),
                        ports: c.port.into_iter().collect(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn inspect_container(&self, id: &str) -> RuntimeResult<serde_json::Value> {
        let state = self.state.lock().unwrap();
        let container = state
            .containers
            .get(&self.host)
            .and_then(|cs| cs.iter().find(|c| c.id == id));
        match container {
            Some(c) => Ok(serde_json::json!({ "Id": c.id, "Image": c.image })),
            None => Err(self.api_err("inspect_container", "no such container")),
        }
    }

    async fn stop_container(&self, id: &str) -> RuntimeResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_stop.contains(&self.host) {
            return Err(self.api_err("stop_container", "daemon unreachable"));
        }
        let container = state
            .containers
            .get_mut(&self.host)
            .and_then(|cs| cs.iter_mut().find(|c| c.id == id));
        match container {
            Some(c) => {
                c.running = false;
                Ok(())
            }
            None => Err(self.api_err("stop_container", "no such container")),
        }
    }

    async fn fetch_logs(&self, id: &str) -> RuntimeResult<String> {
        Ok(format!("log output for {id}"))
    }
}

/// Health gate that reports instances healthy unless their host has been
/// marked otherwise.
#[derive(Default)]
pub struct FakeHealth {
    unhealthy: Mutex<HashSet<String>>,
}

impl FakeHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_unhealthy(&self, host: &str) {
        self.unhealthy.lock().unwrap().insert(host.to_string());
    }
}

#[async_trait]
impl HealthGate for FakeHealth {
    async fn wait_for_healthy(&self, host: &str, _port: u16) -> bool {
        !self.unhealthy.lock().unwrap().contains(host)
    }
}
