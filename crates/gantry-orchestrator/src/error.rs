//! Deployment error taxonomy.

use thiserror::Error;

use gantry_registry::RegistryError;
use gantry_runtime::RuntimeError;

/// Result type alias for orchestrator operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors from rollout and deployment operations.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Registry/store failure. Fatal to the calling operation.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Remote container runtime failure, surfaced as-is. Only health
    /// probes are ever retried.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// No hosts are registered to deploy onto.
    #[error("no hosts registered in the scheduling pool")]
    NoHosts,

    /// An instance did not become healthy; it has been rolled back.
    #[error("instance {instance} of {app} failed to deploy: {reason}")]
    DeployFailed {
        app: String,
        instance: String,
        reason: String,
    },

    /// Rollback of a failed instance itself failed. The registry and the
    /// runtime may now disagree; operator attention required.
    #[error("rollback of instance {instance} for {app} failed: {reason}")]
    RollbackFailed {
        app: String,
        instance: String,
        reason: String,
    },

    /// The rollout did not reach full target count. Instances that did
    /// register stay live; the previous generation is untouched.
    #[error("deployment of {app} incomplete: {failed} of {requested} instances failed")]
    Incomplete {
        app: String,
        requested: u32,
        failed: u32,
    },

    /// A concurrent rollout task aborted unexpectedly.
    #[error("deployment task failure: {0}")]
    Task(String),
}
