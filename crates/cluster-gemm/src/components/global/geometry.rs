use cluster_runtime::transfer::{TileCoord, TileGeometry};

use crate::components::GemmProblem;
use crate::components::tile::StridedLayout;

impl GemmProblem {
    /// The tile of A covering row tile `mi` and K slice `ks`, as stored in shared memory.
    pub fn a_tile(&self, mi: usize, ks: usize) -> (TileCoord, TileGeometry) {
        let (frac_m, frac_k, elem_size) = (self.frac_m(), self.frac_k(), self.elem_size());
        match self.trans_a {
            false => (
                TileCoord::new(mi, ks),
                TileGeometry::new(frac_m, frac_k, self.lda(), elem_size),
            ),
            true => (
                TileCoord::new(ks, mi),
                TileGeometry::new(frac_k, frac_m, self.lda(), elem_size),
            ),
        }
    }

    /// The tile of B covering K slice `ks` and column tile `nj`, as stored in shared memory.
    pub fn b_tile(&self, ks: usize, nj: usize) -> (TileCoord, TileGeometry) {
        let (frac_n, frac_k, elem_size) = (self.frac_n(), self.frac_k(), self.elem_size());
        match self.trans_b {
            false => (
                TileCoord::new(ks, nj),
                TileGeometry::new(frac_k, frac_n, self.ldb(), elem_size),
            ),
            true => (
                TileCoord::new(nj, ks),
                TileGeometry::new(frac_n, frac_k, self.ldb(), elem_size),
            ),
        }
    }

    /// The output tile `(mi, nj)`.
    pub fn c_tile(&self, mi: usize, nj: usize) -> (TileCoord, TileGeometry) {
        (
            TileCoord::new(mi, nj),
            TileGeometry::new(self.frac_m(), self.frac_n(), self.ldc(), self.elem_size()),
        )
    }

    /// Layout of a packed A tile in local memory.
    pub fn a_local(&self) -> StridedLayout {
        match self.trans_a {
            false => StridedLayout::from_ld(self.frac_k(), false),
            true => StridedLayout::from_ld(self.frac_m(), true),
        }
    }

    /// Layout of a packed B tile in local memory.
    pub fn b_local(&self) -> StridedLayout {
        match self.trans_b {
            false => StridedLayout::from_ld(self.frac_n(), false),
            true => StridedLayout::from_ld(self.frac_k(), true),
        }
    }

    /// Layout of a packed C tile in local memory.
    pub fn c_local(&self) -> StridedLayout {
        StridedLayout::row_major(self.frac_n())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_common::Precision;

    #[test]
    fn transposed_a_tiles_walk_columns() {
        let problem = GemmProblem::new(8, 4, 6, Precision::Fp32)
            .with_reduction_tiles(2)
            .with_tiles(2, 1)
            .with_transpose(true, false);

        let (coord, geometry) = problem.a_tile(1, 1);

        // A is stored 6 x 8; row tile 1 of K slice 1 starts at row 3, column 4.
        assert_eq!(coord, TileCoord::new(1, 1));
        assert_eq!(geometry, TileGeometry::new(3, 4, 8, 4));
        assert_eq!(geometry.offset(coord), (3 * 8 + 4) * 4);
    }

    #[test]
    fn transposed_b_tiles_are_rows_of_the_stored_matrix() {
        let problem = GemmProblem::new(4, 8, 6, Precision::Fp64)
            .with_tiles(1, 4)
            .with_transpose(false, true);

        let (coord, geometry) = problem.b_tile(0, 3);

        assert_eq!(geometry.offset(coord), 3 * 2 * 6 * 8);
        assert_eq!(geometry.bytes(), 2 * 6 * 8);
        assert_eq!(problem.b_local().index(5, 1), 6 + 5);
    }
}
