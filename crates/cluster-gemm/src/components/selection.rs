use cluster_common::GemmElement;
use cluster_runtime::CoreContext;

use super::global::{
    FirstBarrier, PartialBuffers, TileGemmStages, reduce_partials, run_pipeline,
};
use super::stage::TileBufferLayout;
use super::{GemmOperands, GemmProblem, Strategy};
use crate::GEMM_INVALID_DESCRIPTOR;

/// Runs the strategy of `problem` on one core, with elements of type `E`.
///
/// Every core of every cluster must call this with the same arguments.
pub(crate) fn execute<E: GemmElement>(
    core: &CoreContext<'_>,
    problem: &GemmProblem,
    operands: &GemmOperands,
    layout: &TileBufferLayout,
) -> i32 {
    match problem.strategy {
        Strategy::RowTiled => {
            let stages = TileGemmStages::<E>::row_tiled(core, problem, operands, layout);
            run_pipeline(core, &stages, FirstBarrier::Global);
        }
        Strategy::ReductionTiled => {
            // Identical on every core, so either every core bails out or none does.
            let Some(partials) = PartialBuffers::new(problem, operands) else {
                return GEMM_INVALID_DESCRIPTOR;
            };

            let output = partials.of(core.cluster_idx());
            let stages = TileGemmStages::<E>::k_slice(core, problem, operands, layout, output);
            run_pipeline(core, &stages, FirstBarrier::Global);

            reduce_partials::<E>(core, problem, layout, &partials);
        }
    }

    0
}
