//! Whole-deployment protocol and the operations exposed to the request
//! layer.
//!
//! A deployment replaces an app's instance set with a new image at a
//! requested count: snapshot the previous generation, plan placement
//! from live container counts, fan out per-instance rollouts, and only
//! after every new instance is registered retire the previous
//! generation. Register-before-retire means there is never a window
//! with zero live instances.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use gantry_health::HealthGate;
use gantry_registry::Registry;
use gantry_runtime::{
    DEFAULT_PORT_RANGE, RuntimeClient, RuntimeFactory, find_available_ports,
    find_container_by_port, stop_container_by_port,
};

use crate::error::{DeployError, DeployResult};
use crate::rollout::InstanceRollout;

/// Read-only snapshot of one app, as reported by `describe`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppStatus {
    pub instances: Vec<String>,
    pub envs: Vec<String>,
    /// Image of the first instance's container, read from the runtime's
    /// own record rather than stored state.
    pub image: Option<String>,
}

/// Logs fetched for one live instance.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceLogs {
    pub instance: String,
    pub logs: String,
}

/// The deployment orchestrator. All collaborators are injected
/// capabilities; cloning shares them.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Registry,
    runtime: Arc<dyn RuntimeFactory>,
    health: Arc<dyn HealthGate>,
    port_range: Range<u16>,
}

impl Orchestrator {
    pub fn new(
        registry: Registry,
        runtime: Arc<dyn RuntimeFactory>,
        health: Arc<dyn HealthGate>,
    ) -> Self {
        Self {
            registry,
            runtime,
            health,
            port_range: DEFAULT_PORT_RANGE,
        }
    }

    pub fn with_port_range(mut self, range: Range<u16>) -> Self {
        self.port_range = range;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Replace `app`'s instance set with `count` instances of `image`.
    ///
    /// Blocks until every planned instance either registers or finishes
    /// its rollback. On failure the previous generation is left intact
    /// and any instances that did register stay live — partial rollout
    /// is a visible outcome, not a hidden one.
    pub async fn deploy(&self, app: &str, image: &str, count: u32) -> DeployResult<()> {
        info!(app, image, count, "starting deployment");

        let previous = self.registry.list_instances(app).await?;
        let hosts = self.registry.list_hosts().await?;
        if hosts.is_empty() {
            return Err(DeployError::NoHosts);
        }

        let distribution = self.container_distribution(&hosts).await?;
        let launch_plan = gantry_placement::plan(&hosts, &distribution, count);
        debug!(app, ?launch_plan, "launch plan computed");

        // Allocate every port up front, before any rollout starts, so an
        // exhausted host aborts the deployment with zero side effects.
        let mut assignments: Vec<(Arc<dyn RuntimeClient>, u16)> = Vec::new();
        for host in &hosts {
            let n = launch_plan.get(host).copied().unwrap_or(0) as usize;
            if n == 0 {
                continue;
            }
            let client = self.runtime.client_for(host);
            let ports = find_available_ports(client.as_ref(), self.port_range.clone(), n).await?;
            for port in ports {
                assignments.push((client.clone(), port));
            }
        }

        let mut rollouts = JoinSet::new();
        for (client, port) in assignments {
            let rollout = InstanceRollout::new(app, client.host(), port, image);
            let registry = self.registry.clone();
            let health = self.health.clone();
            rollouts.spawn(async move {
                rollout
                    .run(&registry, client.as_ref(), health.as_ref())
                    .await
            });
        }

        let mut failures: Vec<DeployError> = Vec::new();
        while let Some(joined) = rollouts.join_next().await {
            match joined {
                Ok(Ok(instance)) => debug!(app, %instance, "instance registered"),
                Ok(Err(err)) => {
                    warn!(app, error = %err, "instance rollout failed");
                    failures.push(err);
                }
                Err(err) => {
                    warn!(app, error = %err, "rollout task aborted");
                    failures.push(DeployError::Task(err.to_string()));
                }
            }
        }

        if !failures.is_empty() {
            // A failed rollback outranks everything else: the system may
            // need operator intervention.
            if let Some(pos) = failures
                .iter()
                .position(|e| matches!(e, DeployError::RollbackFailed { .. }))
            {
                return Err(failures.swap_remove(pos));
            }
            return Err(DeployError::Incomplete {
                app: app.to_string(),
                requested: count,
                failed: failures.len() as u32,
            });
        }

        if previous.is_empty() {
            info!(app, image, count, "deployment complete, no previous generation");
            return Ok(());
        }

        // History is best-effort: a failed append never fails the deploy.
        if let Err(err) = self.registry.append_deployment(app, image, count).await {
            warn!(app, error = %err, "failed to record deployment history");
        }

        info!(app, previous = previous.len(), "retiring previous generation");
        self.teardown(app, &previous).await?;
        info!(app, image, count, "deployment complete");
        Ok(())
    }

    /// Tear down every registered instance of `app`. Idempotent: a
    /// second call sees an empty set and does nothing.
    pub async fn kill_app_instances(&self, app: &str) -> DeployResult<()> {
        let instances = self.registry.list_instances(app).await?;
        if instances.is_empty() {
            return Ok(());
        }
        self.teardown(app, &instances).await
    }

    /// Stop the container serving `host:port` and remove its record.
    pub async fn kill_instance(&self, app: &str, host: &str, port: u16) -> DeployResult<()> {
        info!(app, host, port, "killing instance");
        let client = self.runtime.client_for(host);
        stop_container_by_port(client.as_ref(), port).await?;
        self.registry
            .remove_instance(app, &format!("{host}:{port}"))
            .await?;
        Ok(())
    }

    /// Fetch logs for each of `app`'s live instances. Instances whose
    /// container has already vanished are skipped.
    pub async fn load_app_logs(&self, app: &str) -> DeployResult<Vec<InstanceLogs>> {
        let instances = self.registry.list_instances(app).await?;
        let mut output = Vec::new();
        for instance in instances {
            let Some((host, port)) = split_instance(&instance) else {
                warn!(app, %instance, "malformed instance record, skipping");
                continue;
            };
            let client = self.runtime.client_for(&host);
            match find_container_by_port(client.as_ref(), port).await? {
                Some(container) => {
                    debug!(app, %instance, "loading logs");
                    let logs = client.fetch_logs(&container.id).await?;
                    output.push(InstanceLogs { instance, logs });
                }
                None => warn!(app, %instance, "no container behind instance record"),
            }
        }
        Ok(output)
    }

    /// Read-only snapshot across all apps: instances, env, and the image
    /// of the first instance.
    pub async fn describe(&self) -> DeployResult<BTreeMap<String, AppStatus>> {
        let mut output = BTreeMap::new();
        for app in self.registry.list_apps().await? {
            let instances = self.registry.list_instances(&app).await?;
            let envs = self.registry.list_env(&app).await?;
            let mut image = None;
            if let Some((host, port)) = instances.first().and_then(|i| split_instance(i)) {
                let client = self.runtime.client_for(&host);
                image = find_container_by_port(client.as_ref(), port)
                    .await?
                    .map(|c| c.image);
            }
            output.insert(
                app,
                AppStatus {
                    instances,
                    envs,
                    image,
                },
            );
        }
        Ok(output)
    }

    /// Current container count per host, fanned out across the pool.
    async fn container_distribution(
        &self,
        hosts: &[String],
    ) -> DeployResult<HashMap<String, u32>> {
        let mut set = JoinSet::new();
        for host in hosts {
            let client = self.runtime.client_for(host);
            let host = host.clone();
            set.spawn(async move {
                let containers = client.list_containers().await?;
                Ok::<_, gantry_runtime::RuntimeError>((host, containers.len() as u32))
            });
        }

        let mut distribution = HashMap::new();
        while let Some(joined) = set.join_next().await {
            let (host, n) = joined.map_err(|e| DeployError::Task(e.to_string()))??;
            distribution.insert(host, n);
        }
        Ok(distribution)
    }

    /// Concurrently stop and deregister `instances`. All teardowns are
    /// attempted; the first error (if any) is reported after the fan-in.
    async fn teardown(&self, app: &str, instances: &[String]) -> DeployResult<()> {
        let mut set = JoinSet::new();
        for instance in instances {
            let Some((host, port)) = split_instance(instance) else {
                warn!(app, %instance, "malformed instance record, skipping teardown");
                continue;
            };
            let this = self.clone();
            let app = app.to_string();
            set.spawn(async move { this.kill_instance(&app, &host, port).await });
        }

        let mut first_err = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    warn!(app, error = %err, "instance teardown failed");
                    first_err.get_or_insert(err);
                }
                Err(err) => {
                    warn!(app, error = %err, "teardown task aborted");
                    first_err.get_or_insert(DeployError::Task(err.to_string()));
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Split a `host:port` instance string.
fn split_instance(instance: &str) -> Option<(String, u16)> {
    let (host, port) = instance.rsplit_once(':')?;
    Some((host.to_string(), port.parse().ok()?))
}
