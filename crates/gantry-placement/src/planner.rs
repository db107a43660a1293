//! Launch-count planner.
//!
//! Given the current container-count distribution across hosts and a
//! desired number of new instances, decides how many to launch on each
//! host. Greedy round-robin favoring under-loaded hosts; no global sort,
//! no resource-based bin-packing.

use std::collections::HashMap;

use tracing::debug;

/// How many new instances to launch on each host.
///
/// `hosts` fixes the iteration order; `distribution` holds each host's
/// current container count. The plan never raises any host above
/// `ceil((total + desired) / H)`, so a homogeneous pool ends up with an
/// approximately even spread. An empty host list yields an empty plan.
pub fn plan(
    hosts: &[String],
    distribution: &HashMap<String, u32>,
    desired: u32,
) -> HashMap<String, u32> {
    let mut launching: HashMap<String, u32> = hosts.iter().map(|h| (h.clone(), 0)).collect();
    if hosts.is_empty() || desired == 0 {
        return launching;
    }

    let total: u32 = hosts
        .iter()
        .map(|h| distribution.get(h).copied().unwrap_or(0))
        .sum();
    let ideal = (total + desired).div_ceil(hosts.len() as u32);

    let mut remaining = desired;
    while remaining > 0 {
        // Round-robin indexed by remaining count, skipping hosts already
        // at the ideal. Some host is always below it: H * ideal covers
        // total + desired.
        let start = remaining as usize % hosts.len();
        for offset in 0..hosts.len() {
            let host = &hosts[(start + offset) % hosts.len()];
            let current = distribution.get(host).copied().unwrap_or(0);
            let planned = launching[host];
            if current + planned < ideal {
                *launching.get_mut(host).unwrap() += 1;
                remaining -= 1;
                break;
            }
        }
    }

    debug!(?launching, ideal, "computed launch plan");
    launching
}
