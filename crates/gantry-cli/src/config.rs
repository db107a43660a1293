//! gantry.toml configuration parser.
//!
//! Every field is optional; missing sections fall back to defaults that
//! match a local single-node setup.

use std::ops::Range;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use gantry_health::HealthChecker;
use gantry_runtime::{DEFAULT_DOCKER_PORT, DEFAULT_PORT_RANGE};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GantryConfig {
    pub store: Option<StoreConfig>,
    pub docker: Option<DockerConfig>,
    pub ports: Option<PortsConfig>,
    pub health: Option<HealthConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortsConfig {
    pub min: Option<u16>,
    pub max: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    pub attempts: Option<u32>,
    pub delay_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub path: Option<String>,
}

impl GantryConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GantryConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise all defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn store_url(&self) -> String {
        self.store
            .as_ref()
            .and_then(|s| s.url.clone())
            .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string())
    }

    pub fn docker_port(&self) -> u16 {
        self.docker
            .as_ref()
            .and_then(|d| d.port)
            .unwrap_or(DEFAULT_DOCKER_PORT)
    }

    pub fn port_range(&self) -> Range<u16> {
        let min = self
            .ports
            .as_ref()
            .and_then(|p| p.min)
            .unwrap_or(DEFAULT_PORT_RANGE.start);
        let max = self
            .ports
            .as_ref()
            .and_then(|p| p.max)
            .unwrap_or(DEFAULT_PORT_RANGE.end);
        min..max
    }

    pub fn health_checker(&self) -> HealthChecker {
        let mut checker = HealthChecker::default();
        if let Some(health) = &self.health {
            if let Some(attempts) = health.attempts {
                checker.attempts = attempts;
            }
            if let Some(delay) = health.delay_secs {
                checker.delay = Duration::from_secs(delay);
            }
            if let Some(timeout) = health.timeout_secs {
                checker.timeout = Duration::from_secs(timeout);
            }
            if let Some(path) = &health.path {
                checker.path = path.clone();
            }
        }
        checker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: GantryConfig = toml::from_str("").unwrap();
        assert_eq!(config.store_url(), "redis://127.0.0.1:6379");
        assert_eq!(config.docker_port(), DEFAULT_DOCKER_PORT);
        assert_eq!(config.port_range(), DEFAULT_PORT_RANGE);
        assert_eq!(config.health_checker().attempts, 10);
    }

    #[test]
    fn full_config_overrides_everything() {
        let config: GantryConfig = toml::from_str(
            r#"
            [store]
            url = "redis://registry.internal:6380"

            [docker]
            port = 2376

            [ports]
            min = 9000
            max = 9100

            [health]
            attempts = 5
            delay_secs = 1
            timeout_secs = 3
            path = "/healthz"
            "#,
        )
        .unwrap();

        assert_eq!(config.store_url(), "redis://registry.internal:6380");
        assert_eq!(config.docker_port(), 2376);
        assert_eq!(config.port_range(), 9000..9100);

        let checker = config.health_checker();
        assert_eq!(checker.attempts, 5);
        assert_eq!(checker.delay, Duration::from_secs(1));
        assert_eq!(checker.timeout, Duration::from_secs(3));
        assert_eq!(checker.path, "/healthz");
    }

    #[test]
    fn partial_health_section_keeps_other_defaults() {
        let config: GantryConfig = toml::from_str("[health]\nattempts = 3\n").unwrap();
        let checker = config.health_checker();
        assert_eq!(checker.attempts, 3);
        assert_eq!(checker.path, "/ping");
    }
}
