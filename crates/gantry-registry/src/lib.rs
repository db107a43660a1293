//! Gantry service registry.
//!
//! Thin semantic layer over a shared key/value-and-set store. The
//! registry owns the sets of apps, hosts, per-app environment variables,
//! per-app instances, and per-app deployment history, and publishes a
//! change notification whenever an instance set changes so routers can
//! react without polling.
//!
//! # Components
//!
//! - **`store`** — the `Store` capability trait plus an in-memory backend
//! - **`redis_store`** — Redis-backed `Store` used by the daemon
//! - **`registry`** — semantic operations and the key layout

pub mod error;
pub mod redis_store;
pub mod registry;
pub mod store;

pub use error::{RegistryError, RegistryResult};
pub use redis_store::RedisStore;
pub use registry::{DeploymentRecord, Registry, UPDATES_CHANNEL};
pub use store::{MemoryStore, Store};
