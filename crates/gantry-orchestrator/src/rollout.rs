//! Per-instance rollout state machine.
//!
//! One rollout brings a single `host:port` instance from nothing to a
//! registered, health-checked container:
//!
//! `Pending → ImagePulled → Started → HealthChecked → Registered`
//!
//! A failure at any step diverts to `RollingBack → RolledBack`: the
//! container is stopped if it was started and the instance record is
//! removed. A rollback that itself fails surfaces as
//! [`DeployError::RollbackFailed`], superseding the original error.

use tracing::{info, warn};

use gantry_health::HealthGate;
use gantry_registry::Registry;
use gantry_runtime::{ContainerSpec, RuntimeClient};

use crate::error::{DeployError, DeployResult};

/// Where a rollout currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutPhase {
    Pending,
    ImagePulled,
    Started,
    HealthChecked,
    Registered,
    RollingBack,
    RolledBack,
}

/// One instance's rollout.
#[derive(Debug)]
pub struct InstanceRollout {
    app: String,
    host: String,
    port: u16,
    image: String,
    phase: RolloutPhase,
    container_id: Option<String>,
}

impl InstanceRollout {
    pub fn new(app: &str, host: &str, port: u16, image: &str) -> Self {
        Self {
            app: app.to_string(),
            host: host.to_string(),
            port,
            image: image.to_string(),
            phase: RolloutPhase::Pending,
            container_id: None,
        }
    }

    /// The `host:port` instance string this rollout produces.
    pub fn instance(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn phase(&self) -> RolloutPhase {
        self.phase
    }

    /// Drive the rollout to a terminal phase. On success returns the
    /// registered instance string; on failure the rollback has already
    /// been attempted.
    pub async fn run(
        mut self,
        registry: &Registry,
        client: &dyn RuntimeClient,
        health: &dyn HealthGate,
    ) -> DeployResult<String> {
        match self.advance(registry, client, health).await {
            Ok(()) => Ok(self.instance()),
            Err(err) => {
                warn!(
                    app = %self.app,
                    instance = %self.instance(),
                    error = %err,
                    "rollout failed, rolling back"
                );
                self.phase = RolloutPhase::RollingBack;
                match self.rollback(registry, client).await {
                    Ok(()) => Err(err),
                    Err(rollback_err) => Err(DeployError::RollbackFailed {
                        app: self.app.clone(),
                        instance: self.instance(),
                        reason: rollback_err.to_string(),
                    }),
                }
            }
        }
    }

    async fn advance(
        &mut self,
        registry: &Registry,
        client: &dyn RuntimeClient,
        health: &dyn HealthGate,
    ) -> DeployResult<()> {
        info!(app = %self.app, host = %self.host, image = %self.image, "pulling image");
        client.pull_image(&self.image).await?;
        self.phase = RolloutPhase::ImagePulled;

        // Environment is a snapshot, read once per rollout.
        let env = registry.list_env(&self.app).await?;

        info!(app = %self.app, instance = %self.instance(), "starting container");
        let spec = ContainerSpec {
            image: self.image.clone(),
            env,
        };
        let id = client.create_container(&spec).await?;
        self.container_id = Some(id.clone());
        client.start_container(&id, self.port).await?;
        self.phase = RolloutPhase::Started;

        info!(app = %self.app, instance = %self.instance(), "checking instance health");
        if !health.wait_for_healthy(&self.host, self.port).await {
            return Err(DeployError::DeployFailed {
                app: self.app.clone(),
                instance: self.instance(),
                reason: "health check exhausted retries".to_string(),
            });
        }
        self.phase = RolloutPhase::HealthChecked;

        info!(app = %self.app, instance = %self.instance(), "registering instance");
        registry.add_instance(&self.app, &self.instance()).await?;
        self.phase = RolloutPhase::Registered;
        Ok(())
    }

    async fn rollback(
        &mut self,
        registry: &Registry,
        client: &dyn RuntimeClient,
    ) -> DeployResult<()> {
        if let Some(id) = self.container_id.take() {
            client.stop_container(&id).await?;
        }
        // Registration can fail after the record is written (the notify
        // step runs second), so removal is unconditional; removing an
        // absent record is a harmless no-op.
        registry.remove_instance(&self.app, &self.instance()).await?;
        self.phase = RolloutPhase::RolledBack;
        Ok(())
    }
}
