//! Gantry rollout orchestrator.
//!
//! The deployment engine: plans placement across the host pool, drives
//! concurrent per-instance rollouts (pull → start → health-check →
//! register, with rollback), and replaces the previous generation only
//! once every new instance is live.
//!
//! # Components
//!
//! - **`rollout`** — per-instance rollout state machine
//! - **`orchestrator`** — whole-deployment protocol and exposed operations
//! - **`error`** — the deployment error taxonomy

pub mod error;
pub mod orchestrator;
pub mod rollout;

#[cfg(test)]
mod testutil;

pub use error::{DeployError, DeployResult};
pub use orchestrator::{AppStatus, InstanceLogs, Orchestrator};
pub use rollout::{InstanceRollout, RolloutPhase};
