use crate::CoreContext;
use crate::memory::{LocalAddr, SharedAddr};

/// Wake-flag bit a quad leader sets on a peer once its copy of the payload has landed.
pub const BROADCAST_DONE: u32 = 1;

/// Largest quad a broadcast supports: one wake-flag bit per peer.
pub const MAX_CLUSTERS_PER_QUAD: usize = 32;

/// Wake-flag bit a peer sets on its quad leader once its destination is free.
fn ready_bit(quad_offset: usize) -> u32 {
    1 << quad_offset
}

/// Replicates `size` bytes at `src` into the TCDM of every cluster of the caller's quad, at
/// `dst_offset`.
///
/// See [broadcast_to_clusters].
pub fn broadcast_load_to_clusters(
    core: &CoreContext<'_>,
    dst_offset: usize,
    src: SharedAddr,
    size: usize,
) {
    broadcast_to_clusters(core, dst_offset, size, |dst| core.dma().start_1d(dst, src, size));
}

/// Replicates a payload of `size` bytes into the TCDM of every cluster of the caller's quad, at
/// `dst_offset`.
///
/// Must be called by the data-movement core of every cluster of the quad. Only the quad leader
/// reads the shared memory: `load` issues the transfers filling the leader's own destination,
/// which is then forwarded to each peer. Peers announce that their destination is free and
/// sleep on their wake flag until the leader signals that their copy has landed, so no peer
/// issues any traffic while the broadcast is in flight.
///
/// On return the payload is visible in the caller's TCDM.
pub fn broadcast_to_clusters<F>(core: &CoreContext<'_>, dst_offset: usize, size: usize, load: F)
where
    F: FnOnce(LocalAddr),
{
    let topology = core.topology();
    let cluster = core.cluster_idx();
    let leader = topology.quad_leader(cluster);
    let dm_core = topology.dm_core_idx();

    if cluster != leader {
        core.wake_flag(leader, dm_core)
            .signal(ready_bit(cluster - leader));
        core.wake_flag(cluster, dm_core).wait(BROADCAST_DONE);
        return;
    }

    let peers = topology.quad_peers(cluster);
    let ready = peers
        .clone()
        .fold(0, |mask, peer| mask | ready_bit(peer - leader));
    let local = LocalAddr::new(cluster, dst_offset);
    let dma = core.dma();

    load(local);
    core.wake_flag(leader, dm_core).wait(ready);
    dma.wait_all();

    for peer in peers.clone() {
        dma.start_1d(local.remote(peer), local, size);
    }
    dma.wait_all();

    for peer in peers {
        core.wake_flag(peer, dm_core).signal(BROADCAST_DONE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::System;
    use crate::config::Topology;

    #[test_log::test]
    fn every_cluster_of_every_quad_receives_the_payload() {
        let topology = Topology::new(4, 1)
            .with_clusters_per_quad(2)
            .with_tcdm_size(1024)
            .with_shared_memory_size(1024);
        let system = System::new(topology);
        let payloads: Vec<SharedAddr> = (0..3u32)
            .map(|round| {
                let data: Vec<u32> = (0..16).map(|i| round * 100 + i).collect();
                system.shared().alloc_from_slice(&data).unwrap()
            })
            .collect();

        let status = system.launch(|core| {
            if !core.is_dm_core() {
                return 0;
            }
            let mut mismatches = 0;
            for (round, src) in payloads.iter().enumerate() {
                broadcast_load_to_clusters(core, 64, *src, 64);
                let received = core.tcdm().read().read::<u32>(64, 16);
                let expected: Vec<u32> = (0..16).map(|i| round as u32 * 100 + i).collect();
                if received != expected {
                    mismatches += 1;
                }
            }
            mismatches
        });

        assert!(status.iter().all(|status| *status == 0));
    }
}
