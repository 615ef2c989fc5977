use bytemuck::Pod;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{BytesStorage, SharedAddr};
use crate::MemoryError;

/// Alignment of every shared memory allocation.
pub const SHARED_ALIGNMENT: usize = 8;

/// The large memory every cluster can reach through its transfer engine.
///
/// Allocation is a simple bump pointer, released all at once with [SharedMemory::reset].
#[derive(Debug)]
pub struct SharedMemory {
    storage: RwLock<BytesStorage>,
    cursor: spin::Mutex<usize>,
}

impl SharedMemory {
    /// Zero-initialized shared memory of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            storage: RwLock::new(BytesStorage::new(size)),
            cursor: spin::Mutex::new(0),
        }
    }

    /// Capacity in bytes.
    pub fn size(&self) -> usize {
        self.storage().len()
    }

    /// Reserves `size` bytes aligned to [SHARED_ALIGNMENT].
    pub fn alloc(&self, size: usize) -> Result<SharedAddr, MemoryError> {
        let capacity = self.size();
        let mut cursor = self.cursor.lock();
        let start = cursor.next_multiple_of(SHARED_ALIGNMENT);

        if start + size > capacity {
            return Err(MemoryError::OutOfMemory {
                requested: size,
                available: capacity.saturating_sub(start),
            });
        }

        *cursor = start + size;
        Ok(SharedAddr(start as u64))
    }

    /// Reserves room for `data` and copies it in.
    pub fn alloc_from_slice<E: Pod>(&self, data: &[E]) -> Result<SharedAddr, MemoryError> {
        let addr = self.alloc(size_of_val(data))?;
        self.write(addr, data);
        Ok(addr)
    }

    /// Releases every allocation. Contents are left untouched.
    pub fn reset(&self) {
        *self.cursor.lock() = 0;
    }

    /// Copies `data` to `addr`.
    pub fn write<E: Pod>(&self, addr: SharedAddr, data: &[E]) {
        self.storage_mut().write(addr.as_usize(), data);
    }

    /// Copies `len` elements out of `addr`.
    pub fn read<E: Pod>(&self, addr: SharedAddr, len: usize) -> Vec<E> {
        self.storage().read(addr.as_usize(), len)
    }

    pub(crate) fn storage(&self) -> RwLockReadGuard<'_, BytesStorage> {
        self.storage.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn storage_mut(&self) -> RwLockWriteGuard<'_, BytesStorage> {
        self.storage.write().unwrap_or_else(PoisonError::into_inner)
    }
}
