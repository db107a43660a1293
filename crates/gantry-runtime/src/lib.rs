//! Gantry container runtime client.
//!
//! Capability interface to a remote host's container daemon, plus the
//! advisory port allocator that reads the host's container list to find
//! a free external port.
//!
//! # Components
//!
//! - **`client`** — the `RuntimeClient`/`RuntimeFactory` traits and
//!   by-port container helpers
//! - **`docker`** — Docker Engine API implementation
//! - **`ports`** — external port allocation

pub mod client;
pub mod docker;
pub mod error;
pub mod ports;

pub use client::{
    APP_PORT, ContainerSpec, ContainerSummary, RuntimeClient, RuntimeFactory,
    find_container_by_port, stop_container_by_port,
};
pub use docker::{DEFAULT_DOCKER_PORT, DockerClient, DockerFactory, split_image};
pub use error::{RuntimeError, RuntimeResult};
pub use ports::{DEFAULT_PORT_RANGE, find_available_port, find_available_ports};
