use cluster_common::{Precision, e5m2};
use cluster_runtime::memory::SharedAddr;
use cluster_runtime::{CoreContext, System};
use half::f16;

use crate::components::stage::TileBufferLayout;
use crate::components::{GemmArgs, GemmOperands, GemmProblem, GemmSetupError, execute};

/// Status returned by every core when the descriptor can't be executed.
pub const GEMM_INVALID_DESCRIPTOR: i32 = -1;

/// The GEMM kernel, run by every core of every cluster.
///
/// `args` is the address of a [GemmArgs] in shared memory. The data-movement core of each
/// cluster copies it to the start of the local memory, where every core of the cluster reads it.
/// Returns 0 on success.
pub fn gemm(core: &CoreContext<'_>, args: SharedAddr) -> i32 {
    if core.is_dm_core() {
        let dma = core.dma();
        dma.start_1d(core.local_addr(0), args, size_of::<GemmArgs>());
        dma.wait_all();
    }
    core.cluster_barrier();

    let descriptor = core.tcdm().read().view::<GemmArgs>(0, 1)[0];
    let Some((problem, operands)) = descriptor.decode() else {
        log::error!("Cluster {} read a corrupted descriptor", core.cluster_idx());
        return GEMM_INVALID_DESCRIPTOR;
    };
    let layout = match TileBufferLayout::new(&problem, core.topology().tcdm_size) {
        Ok(layout) => layout,
        Err(err) => {
            log::error!("Cluster {} can't lay out its tiles: {err}", core.cluster_idx());
            return GEMM_INVALID_DESCRIPTOR;
        }
    };

    // Every cluster holds its descriptor before any transfer between clusters.
    core.global_barrier();

    match problem.precision {
        Precision::Fp64 => execute::<f64>(core, &problem, &operands, &layout),
        Precision::Fp32 => execute::<f32>(core, &problem, &operands, &layout),
        Precision::Fp16 => execute::<f16>(core, &problem, &operands, &layout),
        Precision::Fp8 => execute::<e5m2>(core, &problem, &operands, &layout),
    }
}

/// Validates `problem`, writes its descriptor to shared memory and runs [gemm] on `system`.
///
/// Returns the first non-zero core status, or 0 when every core succeeded.
pub fn launch_gemm(
    system: &System,
    problem: &GemmProblem,
    operands: GemmOperands,
) -> Result<i32, GemmSetupError> {
    problem.validate(system.topology())?;

    let workspace = problem.workspace_size();
    if workspace > 0 && operands.workspace.is_none() {
        return Err(GemmSetupError::InvalidConfig(format!(
            "reduction over {} slices needs a workspace of {workspace} bytes",
            problem.k_slices()
        )));
    }

    let args = system
        .shared()
        .alloc_from_slice(&[GemmArgs::new(problem, &operands)])?;

    log::debug!(
        "Launching {} GEMM {}x{}x{} ({})",
        problem.precision,
        problem.m,
        problem.n,
        problem.k,
        problem.strategy
    );
    let status = system
        .launch(|core| gemm(core, args))
        .into_iter()
        .find(|status| *status != 0)
        .unwrap_or(0);
    log::info!(
        "GEMM {}x{}x{} finished with status {status}",
        problem.m,
        problem.n,
        problem.k
    );

    Ok(status)
}
