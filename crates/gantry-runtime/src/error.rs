//! Error types for container runtime operations.

use thiserror::Error;

/// Result type alias for runtime client operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors from the remote container runtime.
///
/// Every API failure carries the host and the operation so a failed
/// fan-out across hosts stays diagnosable.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("container runtime {op} on {host} failed: {message}")]
    Api {
        host: String,
        op: &'static str,
        message: String,
    },

    /// The candidate port range on this host is exhausted.
    #[error("no available port on {host}")]
    NoPortAvailable { host: String },
}
