use cluster_common::GemmElement;
use cluster_runtime::CoreContext;
use cluster_runtime::memory::SharedAddr;
use cluster_runtime::transfer::broadcast_to_clusters;
use core::marker::PhantomData;

use super::StageExecutor;
use crate::components::stage::{Operand, StageBuffer, TileBufferLayout};
use crate::components::tile::{LocalTile, MicroGemm, RowPartition, compute_tile_rows};
use crate::components::{GemmOperands, GemmProblem};

/// The GEMM phase of one cluster: a walk over output tiles, row tile by row tile.
///
/// The A tile is loaded with the first output tile of each row tile and kept for the rest of
/// the row, in the buffer given by the parity of the row tile's position in the walk. B and C
/// tiles alternate buffers with every output tile.
pub struct TileGemmStages<'a, E: GemmElement> {
    problem: &'a GemmProblem,
    operands: &'a GemmOperands,
    layout: &'a TileBufferLayout,
    row_tiles: Vec<usize>,
    k_slice: usize,
    output: SharedAddr,
    beta: f64,
    broadcast_b: bool,
    _elem: PhantomData<E>,
}

impl<'a, E: GemmElement> TileGemmStages<'a, E> {
    /// Row-tiled mode: the cluster owns row tiles `c, c + clusters, ...` and writes the final
    /// result.
    pub fn row_tiled(
        core: &CoreContext<'_>,
        problem: &'a GemmProblem,
        operands: &'a GemmOperands,
        layout: &'a TileBufferLayout,
    ) -> Self {
        Self {
            problem,
            operands,
            layout,
            row_tiles: (core.cluster_idx()..problem.m_tiles)
                .step_by(core.cluster_num())
                .collect(),
            k_slice: 0,
            output: operands.c,
            beta: problem.beta,
            broadcast_b: problem.broadcast_b,
            _elem: PhantomData,
        }
    }

    /// Reduction-tiled mode: the cluster computes the partial product of its K slice over the
    /// whole output into `output`. Only the first slice accumulates onto the previous C.
    pub fn k_slice(
        core: &CoreContext<'_>,
        problem: &'a GemmProblem,
        operands: &'a GemmOperands,
        layout: &'a TileBufferLayout,
        output: SharedAddr,
    ) -> Self {
        let k_slice = core.cluster_idx();

        Self {
            problem,
            operands,
            layout,
            row_tiles: (0..problem.m_tiles).collect(),
            k_slice,
            output,
            beta: if k_slice == 0 { problem.beta } else { 0.0 },
            broadcast_b: false,
            _elem: PhantomData,
        }
    }

    /// Position of the tile's row tile in the walk, row tile index and column tile index.
    fn coords(&self, tile: usize) -> (usize, usize, usize) {
        let ordinal = tile / self.problem.n_tiles;
        (ordinal, self.row_tiles[ordinal], tile % self.problem.n_tiles)
    }

    fn local_tile(&self, operand: Operand, buffer: StageBuffer) -> LocalTile {
        let problem = self.problem;
        let (len, layout) = match operand {
            Operand::A => (problem.frac_m() * problem.frac_k(), problem.a_local()),
            Operand::B => (problem.frac_k() * problem.frac_n(), problem.b_local()),
            Operand::C => (problem.frac_m() * problem.frac_n(), problem.c_local()),
        };
        LocalTile::new(self.layout.slot(operand, buffer), len, layout)
    }
}

impl<E: GemmElement> StageExecutor for TileGemmStages<'_, E> {
    fn tiles(&self) -> usize {
        self.row_tiles.len() * self.problem.n_tiles
    }

    fn store(&self, core: &CoreContext<'_>, tile: usize) {
        let (_, mi, nj) = self.coords(tile);
        let (coord, geometry) = self.problem.c_tile(mi, nj);
        let slot = self.layout.slot(Operand::C, StageBuffer::of(tile));

        log::trace!("Cluster {} stores tile ({mi}, {nj})", core.cluster_idx());
        core.dma()
            .store_2d_tile(self.output, core.local_addr(slot), coord, geometry);
    }

    fn load(&self, core: &CoreContext<'_>, tile: usize) {
        let (ordinal, mi, nj) = self.coords(tile);
        let buffer = StageBuffer::of(tile);
        let dma = core.dma();

        log::trace!("Cluster {} loads tile ({mi}, {nj})", core.cluster_idx());

        let (coord, geometry) = self.problem.b_tile(self.k_slice, nj);
        let slot = self.layout.slot(Operand::B, buffer);
        if self.broadcast_b {
            broadcast_to_clusters(core, slot, geometry.bytes(), |dst| {
                dma.load_2d_tile(dst, self.operands.b, coord, geometry)
            });
        } else {
            dma.load_2d_tile(core.local_addr(slot), self.operands.b, coord, geometry);
        }

        if nj == 0 {
            let (coord, geometry) = self.problem.a_tile(mi, self.k_slice);
            let slot = self.layout.slot(Operand::A, StageBuffer::of(ordinal));
            dma.load_2d_tile(core.local_addr(slot), self.operands.a, coord, geometry);
        }

        if self.beta != 0.0 {
            let (coord, geometry) = self.problem.c_tile(mi, nj);
            let slot = self.layout.slot(Operand::C, buffer);
            dma.load_2d_tile(core.local_addr(slot), self.output, coord, geometry);
        }
    }

    fn compute(&self, core: &CoreContext<'_>, tile: usize) {
        let (ordinal, _, _) = self.coords(tile);
        let buffer = StageBuffer::of(tile);
        let problem = self.problem;
        let params = MicroGemm::new(
            problem.frac_m(),
            problem.frac_n(),
            problem.frac_k(),
            problem.alpha,
            self.beta,
            problem.fast_path,
        );

        compute_tile_rows::<E>(
            core.tcdm(),
            self.local_tile(Operand::A, StageBuffer::of(ordinal)),
            self.local_tile(Operand::B, buffer),
            self.local_tile(Operand::C, buffer),
            &params,
            RowPartition::new(problem.frac_m(), core.compute_core_num(), core.core_idx()),
        );
    }
}
