use serde::{Deserialize, Serialize};

/// Byte address in the shared memory.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SharedAddr(pub u64);

impl SharedAddr {
    /// Address `bytes` further into the shared memory.
    pub fn offset(self, bytes: usize) -> Self {
        Self(self.0 + bytes as u64)
    }

    /// The raw byte offset.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Byte address in the local memory of one cluster.
#[derive(new, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocalAddr {
    /// Cluster owning the memory.
    pub cluster: usize,
    /// Offset from the start of the cluster's TCDM.
    pub offset: usize,
}

impl LocalAddr {
    /// Address `bytes` further into the same TCDM.
    pub fn offset(self, bytes: usize) -> Self {
        Self {
            cluster: self.cluster,
            offset: self.offset + bytes,
        }
    }

    /// The same offset in the TCDM of another cluster.
    pub fn remote(self, cluster: usize) -> Self {
        Self {
            cluster,
            offset: self.offset,
        }
    }
}

/// Any address a transfer engine can read from or write to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Addr {
    /// Address in the shared memory.
    Shared(SharedAddr),
    /// Address in a cluster's TCDM.
    Local(LocalAddr),
}

impl Addr {
    /// Address `bytes` further into the same memory.
    pub fn offset(self, bytes: usize) -> Self {
        match self {
            Addr::Shared(addr) => Addr::Shared(addr.offset(bytes)),
            Addr::Local(addr) => Addr::Local(addr.offset(bytes)),
        }
    }
}

impl From<SharedAddr> for Addr {
    fn from(value: SharedAddr) -> Self {
        Addr::Shared(value)
    }
}

impl From<LocalAddr> for Addr {
    fn from(value: LocalAddr) -> Self {
        Addr::Local(value)
    }
}
