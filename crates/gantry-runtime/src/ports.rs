//! Port allocation — pick a free external port on a target host.
//!
//! The host's own container list is the only source of truth for which
//! ports are bound; there is no reservation table. Allocation is
//! advisory: a concurrent deployment to the same host can pick the same
//! port before either side starts its container.

use std::collections::HashSet;
use std::ops::Range;

use rand::seq::IndexedRandom;
use tracing::debug;

use crate::client::RuntimeClient;
use crate::error::{RuntimeError, RuntimeResult};

/// Candidate external ports for new instances.
pub const DEFAULT_PORT_RANGE: Range<u16> = 8000..8999;

/// A uniformly random port from `range` not currently published by any
/// running container on the client's host.
pub async fn find_available_port(
    client: &dyn RuntimeClient,
    range: Range<u16>,
) -> RuntimeResult<u16> {
    let ports = find_available_ports(client, range, 1).await?;
    Ok(ports[0])
}

/// `count` distinct random free ports on the client's host. The container
/// list is read once, so ports within one batch never collide with each
/// other — only with concurrent allocations by other deployments.
pub async fn find_available_ports(
    client: &dyn RuntimeClient,
    range: Range<u16>,
    count: usize,
) -> RuntimeResult<Vec<u16>> {
    let containers = client.list_containers().await?;
    let in_use: HashSet<u16> = containers
        .iter()
        .flat_map(|c| c.ports.iter().copied())
        .collect();
    let candidates: Vec<u16> = range.filter(|p| !in_use.contains(p)).collect();
    if candidates.len() < count {
        return Err(RuntimeError::NoPortAvailable {
            host: client.host().to_string(),
        });
    }
    let ports: Vec<u16> = candidates
        .choose_multiple(&mut rand::rng(), count)
        .copied()
        .collect();
    debug!(
        host = client.host(),
        ?ports,
        in_use = in_use.len(),
        "allocated ports"
    );
    Ok(ports)
}
