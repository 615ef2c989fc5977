use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::BytesStorage;

/// Tightly-coupled data memory: the small fast memory shared by the cores of one cluster.
///
/// Compute cores access it directly through [Tcdm::read] and [Tcdm::write]; transfer engines
/// copy into and out of it. Which core may touch which region at which time is decided by the
/// kernel, the lock only keeps individual accesses memory safe.
#[derive(Debug)]
pub struct Tcdm {
    storage: RwLock<BytesStorage>,
}

impl Tcdm {
    /// Zero-initialized TCDM of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            storage: RwLock::new(BytesStorage::new(size)),
        }
    }

    /// Capacity in bytes.
    pub fn size(&self) -> usize {
        self.read().len()
    }

    /// Shared access to the whole memory.
    pub fn read(&self) -> RwLockReadGuard<'_, BytesStorage> {
        self.storage.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access to the whole memory.
    pub fn write(&self) -> RwLockWriteGuard<'_, BytesStorage> {
        self.storage.write().unwrap_or_else(PoisonError::into_inner)
    }
}
