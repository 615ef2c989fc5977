mod address;
mod shared;
mod storage;
mod tcdm;

pub use address::*;
pub use shared::*;
pub use storage::*;
pub use tcdm::*;

use crate::config::Topology;

/// Every memory of a [System](crate::System), reachable through an [Addr].
#[derive(Debug)]
pub struct MemoryMap {
    shared: SharedMemory,
    tcdms: Vec<Tcdm>,
}

impl MemoryMap {
    /// Creates the shared memory and one TCDM per cluster of the topology.
    pub fn new(topology: &Topology) -> Self {
        Self {
            shared: SharedMemory::new(topology.shared_memory_size),
            tcdms: (0..topology.clusters)
                .map(|_| Tcdm::new(topology.tcdm_size))
                .collect(),
        }
    }

    /// The memory shared by all clusters.
    pub fn shared(&self) -> &SharedMemory {
        &self.shared
    }

    /// The local memory of the given cluster.
    pub fn tcdm(&self, cluster: usize) -> &Tcdm {
        &self.tcdms[cluster]
    }

    /// Copies `size` bytes out of the memory at `addr`.
    pub fn read_bytes(&self, addr: Addr, size: usize) -> Vec<u8> {
        match addr {
            Addr::Shared(addr) => self.shared.storage().read_bytes(addr.as_usize(), size),
            Addr::Local(addr) => self.tcdm(addr.cluster).read().read_bytes(addr.offset, size),
        }
    }

    /// Writes `bytes` into the memory at `addr`.
    pub fn write_bytes(&self, addr: Addr, bytes: &[u8]) {
        match addr {
            Addr::Shared(addr) => self.shared.storage_mut().write_bytes(addr.as_usize(), bytes),
            Addr::Local(addr) => self
                .tcdm(addr.cluster)
                .write()
                .write_bytes(addr.offset, bytes),
        }
    }
}
