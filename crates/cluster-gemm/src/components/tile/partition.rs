use cluster_common::GemmElement;
use cluster_runtime::memory::Tcdm;
use core::iter::StepBy;
use core::ops::Range;

use super::{MicroGemm, StridedLayout, micro_add, micro_gemm};

/// Split of the rows of one tile between the compute cores of a cluster.
///
/// Rows are dealt round-robin: unit `u` of `units` gets rows `u, u + units, u + 2 * units, ...`,
/// so every unit gets `rows / units` rows and the first `rows % units` units get one more.
#[derive(new, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowPartition {
    /// Rows of the tile.
    pub rows: usize,
    /// Number of cooperating units.
    pub units: usize,
    /// This unit, in `0..units`.
    pub unit: usize,
}

impl RowPartition {
    /// Number of rows assigned to this unit. Zero when there are more units than rows.
    pub fn row_count(&self) -> usize {
        self.rows / self.units + usize::from(self.unit < self.rows % self.units)
    }

    /// Tile rows assigned to this unit.
    pub fn rows(&self) -> StepBy<Range<usize>> {
        (self.unit..self.rows).step_by(self.units)
    }

    /// The layout of this unit's rows within a layout of the whole tile.
    pub fn restrict(&self, layout: StridedLayout) -> StridedLayout {
        layout.interleaved(self.unit, self.units)
    }
}

/// A matrix tile resident in local memory.
#[derive(new, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalTile {
    /// Byte offset of the slot.
    pub offset: usize,
    /// Elements in the slot.
    pub len: usize,
    pub layout: StridedLayout,
}

/// Runs the micro-kernel on this unit's share of the output rows of one tile.
///
/// `params.rows` is the row count of the whole tile. Operands are read under shared access so
/// every unit computes concurrently; only the unit's own rows of `c` are written back.
pub fn compute_tile_rows<E: GemmElement>(
    tcdm: &Tcdm,
    a: LocalTile,
    b: LocalTile,
    c: LocalTile,
    params: &MicroGemm,
    partition: RowPartition,
) {
    let rows = partition.row_count();
    if rows == 0 {
        return;
    }

    let cols = params.cols;
    let c_layout = partition.restrict(c.layout);
    let out_layout = StridedLayout::row_major(cols);
    let mut out = vec![E::zeroed(); rows * cols];

    {
        let memory = tcdm.read();
        if params.beta != 0.0 {
            gather(memory.view::<E>(c.offset, c.len), c_layout, &mut out, rows, cols);
        }
        micro_gemm(
            &MicroGemm { rows, ..*params },
            memory.view::<E>(a.offset, a.len),
            partition.restrict(a.layout),
            memory.view::<E>(b.offset, b.len),
            b.layout,
            &mut out,
            out_layout,
        );
    }

    let mut memory = tcdm.write();
    scatter(&out, memory.view_mut::<E>(c.offset, c.len), c_layout, rows, cols);
}

/// Adds `partial` into `acc` on this unit's share of the rows of one tile.
pub fn add_tile_rows<E: GemmElement>(
    tcdm: &Tcdm,
    acc: LocalTile,
    partial: LocalTile,
    cols: usize,
    partition: RowPartition,
) {
    let rows = partition.row_count();
    if rows == 0 {
        return;
    }

    let acc_layout = partition.restrict(acc.layout);
    let out_layout = StridedLayout::row_major(cols);
    let mut out = vec![E::zeroed(); rows * cols];

    {
        let memory = tcdm.read();
        gather(memory.view::<E>(acc.offset, acc.len), acc_layout, &mut out, rows, cols);
        micro_add(
            rows,
            cols,
            memory.view::<E>(partial.offset, partial.len),
            partition.restrict(partial.layout),
            &mut out,
            out_layout,
        );
    }

    let mut memory = tcdm.write();
    scatter(&out, memory.view_mut::<E>(acc.offset, acc.len), acc_layout, rows, cols);
}

fn gather<E: Copy>(src: &[E], layout: StridedLayout, dst: &mut [E], rows: usize, cols: usize) {
    for i in 0..rows {
        for j in 0..cols {
            dst[i * cols + j] = src[layout.index(i, j)];
        }
    }
}

fn scatter<E: Copy>(src: &[E], dst: &mut [E], layout: StridedLayout, rows: usize, cols: usize) {
    for i in 0..rows {
        for j in 0..cols {
            dst[layout.index(i, j)] = src[i * cols + j];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_differ_by_at_most_one() {
        let counts: Vec<usize> = (0..4)
            .map(|unit| RowPartition::new(10, 4, unit).row_count())
            .collect();

        assert_eq!(counts, vec![3, 3, 2, 2]);
    }

    #[test]
    fn rows_are_interleaved_and_cover_the_tile_once() {
        let mut covered: Vec<usize> = (0..3)
            .flat_map(|unit| RowPartition::new(8, 3, unit).rows())
            .collect();

        assert_eq!(
            RowPartition::new(8, 3, 1).rows().collect::<Vec<_>>(),
            vec![1, 4, 7]
        );
        covered.sort();
        assert_eq!(covered, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn more_units_than_rows() {
        let partition = RowPartition::new(2, 8, 5);

        assert_eq!(partition.row_count(), 0);
        assert_eq!(partition.rows().count(), 0);
    }

    #[test]
    fn units_compute_disjoint_rows_of_the_same_tile() {
        // A = [[1, 2], [3, 4], [5, 6]] at 0, B = I at 32, C at 64.
        let tcdm = Tcdm::new(256);
        tcdm.write().write(0, &[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]);
        tcdm.write().write(32, &[1.0f32, 0.0, 0.0, 1.0]);
        let a = LocalTile::new(0, 6, StridedLayout::row_major(2));
        let b = LocalTile::new(32, 4, StridedLayout::row_major(2));
        let c = LocalTile::new(64, 6, StridedLayout::row_major(2));
        let params = MicroGemm::new(3, 2, 2, 1.0, 0.0, false);

        for unit in 0..2 {
            compute_tile_rows::<f32>(&tcdm, a, b, c, &params, RowPartition::new(3, 2, unit));
        }

        assert_eq!(
            tcdm.read().read::<f32>(64, 6),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }
}
