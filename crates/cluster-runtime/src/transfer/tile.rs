use super::DmaEngine;
use crate::memory::Addr;

/// Position of a tile in the grid of tiles covering a matrix.
#[derive(new, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Row-tile index.
    pub row: usize,
    /// Column-tile index.
    pub col: usize,
}

/// Shape of the tiles of a row-major matrix with leading dimension `ld`.
#[derive(new, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGeometry {
    /// Rows per tile.
    pub rows: usize,
    /// Columns per tile.
    pub cols: usize,
    /// Elements between the starts of two consecutive matrix rows.
    pub ld: usize,
    /// Bytes per element.
    pub elem_size: usize,
}

impl TileGeometry {
    /// Size of one packed tile in bytes.
    pub fn bytes(&self) -> usize {
        self.rows * self.cols * self.elem_size
    }

    /// Byte offset of the first element of the tile `coord` in the full matrix.
    pub fn offset(&self, coord: TileCoord) -> usize {
        (coord.row * self.rows * self.ld + coord.col * self.cols) * self.elem_size
    }
}

impl DmaEngine {
    /// Starts copying the `tile_idx`-th chunk of `tile_size` elements of a vector.
    pub fn load_1d_tile(
        &self,
        dst: impl Into<Addr>,
        src: impl Into<Addr>,
        tile_idx: usize,
        tile_size: usize,
        elem_size: usize,
    ) {
        let size = tile_size * elem_size;
        self.start_1d(dst, src.into().offset(tile_idx * size), size);
    }

    /// Starts copying the tile `coord` of the matrix at `src` into a packed buffer at `dst`.
    pub fn load_2d_tile(
        &self,
        dst: impl Into<Addr>,
        src: impl Into<Addr>,
        coord: TileCoord,
        geometry: TileGeometry,
    ) {
        let row_bytes = geometry.cols * geometry.elem_size;
        self.start_2d(
            dst,
            src.into().offset(geometry.offset(coord)),
            row_bytes,
            row_bytes,
            geometry.ld * geometry.elem_size,
            geometry.rows,
        );
    }

    /// Starts copying a packed buffer at `src` into the tile `coord` of the matrix at `dst`.
    pub fn store_2d_tile(
        &self,
        dst: impl Into<Addr>,
        src: impl Into<Addr>,
        coord: TileCoord,
        geometry: TileGeometry,
    ) {
        let row_bytes = geometry.cols * geometry.elem_size;
        self.start_2d(
            dst.into().offset(geometry.offset(coord)),
            src,
            row_bytes,
            geometry.ld * geometry.elem_size,
            row_bytes,
            geometry.rows,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Topology;
    use crate::memory::{LocalAddr, MemoryMap};
    use std::sync::Arc;

    fn engine() -> (Arc<MemoryMap>, DmaEngine) {
        let topology = Topology::new(1, 1)
            .with_tcdm_size(256)
            .with_shared_memory_size(1024);
        let memory = Arc::new(MemoryMap::new(&topology));
        let engine = DmaEngine::new(0, memory.clone(), None);
        (memory, engine)
    }

    #[test_log::test]
    fn vector_chunk_lands_packed_in_local_memory() {
        let (memory, engine) = engine();
        let vector: Vec<u32> = (0..16).collect();
        let src = memory.shared().alloc_from_slice(&vector).unwrap();

        engine.load_1d_tile(LocalAddr::new(0, 32), src, 2, 4, size_of::<u32>());
        engine.wait_all();

        let tcdm = memory.tcdm(0).read();
        assert_eq!(tcdm.read::<u32>(32, 4), vec![8, 9, 10, 11]);
        assert_eq!(tcdm.read::<u32>(48, 1), vec![0]);
    }

    #[test_log::test]
    fn tile_store_scatters_back_into_matrix() {
        let (memory, engine) = engine();
        let matrix = memory.shared().alloc_from_slice(&[0u16; 16]).unwrap();
        let geometry = TileGeometry::new(2, 2, 4, size_of::<u16>());
        memory.tcdm(0).write().write(0, &[1u16, 2, 3, 4]);

        engine.store_2d_tile(matrix, LocalAddr::new(0, 0), TileCoord::new(1, 1), geometry);
        engine.wait_all();

        let stored = memory.shared().read::<u16>(matrix, 16);
        assert_eq!(&stored[8..12], &[0, 0, 1, 2]);
        assert_eq!(&stored[12..16], &[0, 0, 3, 4]);
    }

    #[test]
    fn tile_offset_skips_full_tile_rows() {
        let geometry = TileGeometry::new(2, 3, 9, 4);

        assert_eq!(geometry.offset(TileCoord::new(0, 0)), 0);
        assert_eq!(geometry.offset(TileCoord::new(0, 2)), 6 * 4);
        assert_eq!(geometry.offset(TileCoord::new(1, 1)), (18 + 3) * 4);
        assert_eq!(geometry.bytes(), 24);
    }
}
