use cluster_common::GemmElement;
use cluster_runtime::CoreContext;
use cluster_runtime::memory::SharedAddr;
use core::marker::PhantomData;

use super::{FirstBarrier, StageExecutor, run_pipeline};
use crate::components::stage::{StageBuffer, TileBufferLayout};
use crate::components::tile::{LocalTile, RowPartition, add_tile_rows};
use crate::components::{GemmOperands, GemmProblem};

/// Where the partial product of each K slice lives in reduction-tiled mode.
///
/// The first slice is computed straight into C, the others into consecutive `M x N` regions of
/// the workspace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartialBuffers {
    c: SharedAddr,
    workspace: SharedAddr,
    size: usize,
}

impl PartialBuffers {
    /// The partial buffers of `problem`, or `None` if a workspace is needed but missing.
    pub fn new(problem: &GemmProblem, operands: &GemmOperands) -> Option<Self> {
        let workspace = match operands.workspace {
            Some(workspace) => workspace,
            None if problem.k_slices() == 1 => operands.c,
            None => return None,
        };

        Some(Self {
            c: operands.c,
            workspace,
            size: problem.m * problem.n * problem.elem_size(),
        })
    }

    /// The buffer of K slice `slice`.
    pub fn of(&self, slice: usize) -> SharedAddr {
        match slice {
            0 => self.c,
            _ => self.workspace.offset((slice - 1) * self.size),
        }
    }
}

/// Sums the partial products of every K slice into C with a binary tree.
///
/// At level `l`, after a global barrier, cluster `r` with `r % 2^(l+1) == 0` adds the buffer of
/// cluster `r + 2^l` into its own. The receiver is always the left operand, so four slices sum
/// as `(P0 + P1) + (P2 + P3)`.
pub fn reduce_partials<E: GemmElement>(
    core: &CoreContext<'_>,
    problem: &GemmProblem,
    layout: &TileBufferLayout,
    partials: &PartialBuffers,
) {
    let slices = problem.k_slices();
    let cluster = core.cluster_idx();
    let mut stride = 1;

    while stride < slices {
        core.global_barrier();

        if cluster % (2 * stride) == 0 && cluster + stride < slices {
            if core.is_dm_core() {
                log::debug!(
                    "Cluster {cluster} accumulates the partial product of cluster {}",
                    cluster + stride
                );
            }
            let stages = ReductionStages::<E>::new(
                problem,
                layout,
                partials.of(cluster),
                partials.of(cluster + stride),
            );
            run_pipeline(core, &stages, FirstBarrier::Cluster);
        }

        stride *= 2;
    }
}

/// One step of the reduction tree: `receiver += sender`, output tile by output tile.
pub struct ReductionStages<'a, E: GemmElement> {
    problem: &'a GemmProblem,
    layout: &'a TileBufferLayout,
    receiver: SharedAddr,
    sender: SharedAddr,
    _elem: PhantomData<E>,
}

impl<'a, E: GemmElement> ReductionStages<'a, E> {
    pub fn new(
        problem: &'a GemmProblem,
        layout: &'a TileBufferLayout,
        receiver: SharedAddr,
        sender: SharedAddr,
    ) -> Self {
        Self {
            problem,
            layout,
            receiver,
            sender,
            _elem: PhantomData,
        }
    }

    fn coords(&self, tile: usize) -> (usize, usize) {
        (tile / self.problem.n_tiles, tile % self.problem.n_tiles)
    }

    fn tile_len(&self) -> usize {
        self.problem.frac_m() * self.problem.frac_n()
    }
}

impl<E: GemmElement> StageExecutor for ReductionStages<'_, E> {
    fn tiles(&self) -> usize {
        self.problem.m_tiles * self.problem.n_tiles
    }

    fn store(&self, core: &CoreContext<'_>, tile: usize) {
        let (mi, nj) = self.coords(tile);
        let (coord, geometry) = self.problem.c_tile(mi, nj);
        let slot = self.layout.acc_slot(StageBuffer::of(tile));

        core.dma()
            .store_2d_tile(self.receiver, core.local_addr(slot), coord, geometry);
    }

    fn load(&self, core: &CoreContext<'_>, tile: usize) {
        let (mi, nj) = self.coords(tile);
        let (coord, geometry) = self.problem.c_tile(mi, nj);
        let buffer = StageBuffer::of(tile);
        let dma = core.dma();

        let acc = core.local_addr(self.layout.acc_slot(buffer));
        dma.load_2d_tile(acc, self.receiver, coord, geometry);
        let partial = core.local_addr(self.layout.partial_slot(buffer));
        dma.load_2d_tile(partial, self.sender, coord, geometry);
    }

    fn compute(&self, core: &CoreContext<'_>, tile: usize) {
        let buffer = StageBuffer::of(tile);
        let local = self.problem.c_local();
        let len = self.tile_len();

        add_tile_rows::<E>(
            core.tcdm(),
            LocalTile::new(self.layout.acc_slot(buffer), len, local),
            LocalTile::new(self.layout.partial_slot(buffer), len, local),
            self.problem.frac_n(),
            RowPartition::new(
                self.problem.frac_m(),
                core.compute_core_num(),
                core.core_idx(),
            ),
        );
    }
}
