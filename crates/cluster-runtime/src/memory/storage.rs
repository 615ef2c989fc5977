use bytemuck::Pod;
use core::fmt::Debug;

/// Byte-addressable storage backed by 64-bit words.
///
/// Backing the bytes with words keeps every element-aligned offset aligned for all element
/// types up to 8 bytes, so typed views can borrow the memory directly. Accesses outside of the
/// storage panic, which is how an out-of-bounds access faults the simulated core.
pub struct BytesStorage {
    words: Vec<u64>,
    len: usize,
}

impl BytesStorage {
    /// Zero-initialized storage of `len` bytes.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(8)],
            len,
        }
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the storage holds no bytes at all.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All bytes of the storage.
    pub fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.len]
    }

    /// All bytes of the storage, mutably.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.words)[..self.len]
    }

    /// Borrows `len` elements starting at byte `offset`.
    ///
    /// # Panics
    ///
    /// If the range is out of bounds or `offset` is not aligned for `E`.
    pub fn view<E: Pod>(&self, offset: usize, len: usize) -> &[E] {
        let size = len * size_of::<E>();
        bytemuck::cast_slice(&self.bytes()[offset..offset + size])
    }

    /// Mutably borrows `len` elements starting at byte `offset`.
    ///
    /// # Panics
    ///
    /// If the range is out of bounds or `offset` is not aligned for `E`.
    pub fn view_mut<E: Pod>(&mut self, offset: usize, len: usize) -> &mut [E] {
        let size = len * size_of::<E>();
        bytemuck::cast_slice_mut(&mut self.bytes_mut()[offset..offset + size])
    }

    /// Copies `len` elements starting at byte `offset`, regardless of alignment.
    pub fn read<E: Pod>(&self, offset: usize, len: usize) -> Vec<E> {
        let size = len * size_of::<E>();
        bytemuck::pod_collect_to_vec(&self.bytes()[offset..offset + size])
    }

    /// Writes `data` starting at byte `offset`, regardless of alignment.
    pub fn write<E: Pod>(&mut self, offset: usize, data: &[E]) {
        self.write_bytes(offset, bytemuck::cast_slice(data));
    }

    /// Copies `size` raw bytes starting at `offset`.
    pub fn read_bytes(&self, offset: usize, size: usize) -> Vec<u8> {
        self.bytes()[offset..offset + size].to_vec()
    }

    /// Writes raw bytes starting at `offset`.
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.bytes_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

impl Debug for BytesStorage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BytesStorage")
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_views_alias_the_bytes() {
        let mut storage = BytesStorage::new(64);
        storage.write(8, &[1.5f64, -2.0]);

        assert_eq!(storage.view::<f64>(8, 2), &[1.5, -2.0]);
        assert_eq!(storage.read::<f64>(16, 1), vec![-2.0]);

        storage.view_mut::<f32>(0, 2).copy_from_slice(&[3.0, 4.0]);
        assert_eq!(storage.read::<f32>(4, 1), vec![4.0]);
    }

    #[test]
    fn unaligned_reads_are_copied() {
        let mut storage = BytesStorage::new(16);
        storage.write(1, &[7u16, 9u16]);

        assert_eq!(storage.read::<u16>(1, 2), vec![7, 9]);
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_access_faults() {
        let storage = BytesStorage::new(16);
        storage.view::<f64>(8, 2);
    }
}
