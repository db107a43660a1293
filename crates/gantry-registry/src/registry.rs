//! The registry proper — semantic operations over the raw store.
//!
//! Owns the key layout (`apps`, `hosts`, `{app}:envs`, `{app}:instances`,
//! `deployments:{app}`) and the router notification channel. An instance
//! record `host:port` is a claim that a health-checked container was
//! serving the app there when the record was added; the registry never
//! inspects containers itself.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::store::Store;

/// Channel on which instance-set changes are announced to routers.
pub const UPDATES_CHANNEL: &str = "updates";

const APPS_KEY: &str = "apps";
const HOSTS_KEY: &str = "hosts";

fn envs_key(app: &str) -> String {
    format!("{app}:envs")
}

fn instances_key(app: &str) -> String {
    format!("{app}:instances")
}

fn deployments_key(app: &str) -> String {
    format!("deployments:{app}")
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// One append-only deployment history entry. Written once a rollout's new
/// instances are confirmed live; never read back by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub timestamp: u64,
    pub app: String,
    pub image: String,
    pub count: u32,
}

/// Handle to the shared service registry.
///
/// Cheap to clone; all state lives behind the injected store.
#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn Store>,
}

impl Registry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    // ── Apps ───────────────────────────────────────────────────────

    pub async fn list_apps(&self) -> RegistryResult<Vec<String>> {
        self.store.members(APPS_KEY).await
    }

    pub async fn add_app(&self, app: &str) -> RegistryResult<bool> {
        self.store.add_member(APPS_KEY, app).await
    }

    pub async fn remove_app(&self, app: &str) -> RegistryResult<bool> {
        self.store.remove_member(APPS_KEY, app).await
    }

    // ── Hosts ──────────────────────────────────────────────────────
    //
    // A host entry is a scheduling candidate only; it does not imply any
    // container is running there.

    pub async fn list_hosts(&self) -> RegistryResult<Vec<String>> {
        self.store.members(HOSTS_KEY).await
    }

    pub async fn add_host(&self, host: &str) -> RegistryResult<bool> {
        self.store.add_member(HOSTS_KEY, host).await
    }

    pub async fn remove_host(&self, host: &str) -> RegistryResult<bool> {
        self.store.remove_member(HOSTS_KEY, host).await
    }

    // ── Environment ────────────────────────────────────────────────

    pub async fn list_env(&self, app: &str) -> RegistryResult<Vec<String>> {
        self.store.members(&envs_key(app)).await
    }

    /// Add a `KEY=VALUE` entry to the app's environment set.
    pub async fn add_env(&self, app: &str, env: &str) -> RegistryResult<bool> {
        self.store.add_member(&envs_key(app), env).await
    }

    /// Remove every stored variable for `key`, whatever value it was
    /// stored under. A variable may have been set several times with
    /// different values, so removal is prefix-matched on `KEY=`.
    pub async fn remove_env(&self, app: &str, key: &str) -> RegistryResult<u32> {
        let prefix = format!("{key}=");
        let envs = self.list_env(app).await?;
        let mut removed = 0;
        for env in envs.iter().filter(|e| e.starts_with(&prefix)) {
            if self.store.remove_member(&envs_key(app), env).await? {
                removed += 1;
            }
        }
        debug!(app, key, removed, "removed env entries");
        Ok(removed)
    }

    // ── Instances ──────────────────────────────────────────────────

    pub async fn list_instances(&self, app: &str) -> RegistryResult<Vec<String>> {
        self.store.members(&instances_key(app)).await
    }

    /// Register a live `host:port` instance and notify routers.
    pub async fn add_instance(&self, app: &str, instance: &str) -> RegistryResult<bool> {
        let added = self.store.add_member(&instances_key(app), instance).await?;
        self.notify_routers().await?;
        Ok(added)
    }

    /// Remove an instance record and notify routers.
    pub async fn remove_instance(&self, app: &str, instance: &str) -> RegistryResult<bool> {
        let removed = self
            .store
            .remove_member(&instances_key(app), instance)
            .await?;
        self.notify_routers().await?;
        Ok(removed)
    }

    async fn notify_routers(&self) -> RegistryResult<()> {
        self.store
            .publish(UPDATES_CHANNEL, &epoch_millis().to_string())
            .await
    }

    // ── Deployment history ─────────────────────────────────────────

    /// Append one deployment record for `app`.
    pub async fn append_deployment(
        &self,
        app: &str,
        image: &str,
        count: u32,
    ) -> RegistryResult<()> {
        let record = DeploymentRecord {
            timestamp: epoch_secs(),
            app: app.to_string(),
            image: image.to_string(),
            count,
        };
        let serialized =
            serde_json::to_string(&record).map_err(|e| RegistryError::Serialize(e.to_string()))?;
        self.store
            .push_record(&deployments_key(app), &serialized)
            .await
    }

    /// The most recent `limit` deployment records for `app`, newest first.
    pub async fn list_deployments(
        &self,
        app: &str,
        limit: usize,
    ) -> RegistryResult<Vec<DeploymentRecord>> {
        let raw = self
            .store
            .recent_records(&deployments_key(app), limit)
            .await?;
        raw.iter()
            .map(|item| {
                serde_json::from_str(item).map_err(|e| RegistryError::Deserialize(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn test_registry() -> (Registry, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Registry::new(store.clone()), store)
    }

    #[tokio::test]
    async fn apps_add_list_remove() {
        let (registry, _) = test_registry();

        registry.add_app("web").await.unwrap();
        registry.add_app("api").await.unwrap();
        assert_eq!(registry.list_apps().await.unwrap(), vec!["api", "web"]);

        assert!(registry.remove_app("api").await.unwrap());
        assert_eq!(registry.list_apps().await.unwrap(), vec!["web"]);
    }

    #[tokio::test]
    async fn hosts_are_independent_of_apps() {
        let (registry, _) = test_registry();

        registry.add_host("10.0.0.1").await.unwrap();
        registry.add_host("10.0.0.2").await.unwrap();
        assert_eq!(registry.list_hosts().await.unwrap().len(), 2);
        assert!(registry.list_apps().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_env_matches_all_values_for_key() {
        let (registry, _) = test_registry();

        registry.add_env("web", "K=V1").await.unwrap();
        registry.add_env("web", "K=V2").await.unwrap();
        registry.add_env("web", "KEEP=1").await.unwrap();

        let removed = registry.remove_env("web", "K").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(registry.list_env("web").await.unwrap(), vec!["KEEP=1"]);
    }

    #[tokio::test]
    async fn remove_env_does_not_match_longer_key_names() {
        let (registry, _) = test_registry();

        registry.add_env("web", "PORT=80").await.unwrap();
        registry.add_env("web", "PORT_RANGE=8000").await.unwrap();

        registry.remove_env("web", "PORT").await.unwrap();
        assert_eq!(
            registry.list_env("web").await.unwrap(),
            vec!["PORT_RANGE=8000"]
        );
    }

    #[tokio::test]
    async fn instance_changes_notify_routers() {
        let (registry, store) = test_registry();

        registry.add_instance("web", "10.0.0.1:8042").await.unwrap();
        registry
            .remove_instance("web", "10.0.0.1:8042")
            .await
            .unwrap();

        let published = store.published();
        assert_eq!(published.len(), 2);
        assert!(published.iter().all(|(chan, _)| chan == UPDATES_CHANNEL));
        // Payload is a timestamp, not a structured message.
        assert!(published[0].1.parse::<u128>().is_ok());
    }

    #[tokio::test]
    async fn env_changes_do_not_notify_routers() {
        let (registry, store) = test_registry();

        registry.add_env("web", "K=V").await.unwrap();
        registry.remove_env("web", "K").await.unwrap();
        assert!(store.published().is_empty());
    }

    #[tokio::test]
    async fn deployment_record_round_trip() {
        let (registry, _) = test_registry();

        registry.append_deployment("web", "app:v1", 3).await.unwrap();

        let records = registry.list_deployments("web", 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].app, "web");
        assert_eq!(records[0].image, "app:v1");
        assert_eq!(records[0].count, 3);
        assert!(records[0].timestamp > 0);
    }

    #[tokio::test]
    async fn deployments_are_newest_first_and_limited() {
        let (registry, _) = test_registry();

        registry.append_deployment("web", "app:v1", 2).await.unwrap();
        registry.append_deployment("web", "app:v2", 2).await.unwrap();
        registry.append_deployment("web", "app:v3", 2).await.unwrap();

        let records = registry.list_deployments("web", 2).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].image, "app:v3");
        assert_eq!(records[1].image, "app:v2");
    }

    #[tokio::test]
    async fn deployment_history_is_per_app() {
        let (registry, _) = test_registry();

        registry.append_deployment("web", "app:v1", 1).await.unwrap();
        assert!(registry.list_deployments("api", 10).await.unwrap().is_empty());
    }
}
