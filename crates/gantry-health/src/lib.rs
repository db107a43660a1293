//! Gantry health checker.
//!
//! Polls an instance's liveness endpoint with bounded retries and a
//! fixed inter-attempt delay. The orchestrator consumes the result as a
//! boolean gate; underlying transport errors never escape.

pub mod checker;
pub mod probe;

pub use checker::{HealthChecker, HealthGate};
pub use probe::{ProbeResult, http_probe};
