//! Peering-count arithmetic for inter-region networks.
//!
//! These are standalone sizing helpers. Plan validation does not check a
//! plan's region count against any peering topology.

/// Links needed to connect `regions` networks in a full mesh: `n(n-1)/2`.
pub fn mesh_peering_count(regions: usize) -> usize {
    regions * regions.saturating_sub(1) / 2
}

/// Links needed for a hub-and-spoke layout: one per spoke.
pub fn hub_spoke_peering_count(spokes: usize) -> usize {
    spokes
}
