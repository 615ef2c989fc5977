use cluster_common::Precision;
use cluster_gemm::components::{GemmArgs, GemmOperands, GemmProblem, GemmSetupError};
use cluster_gemm::{GEMM_INVALID_DESCRIPTOR, gemm, launch_gemm};
use cluster_runtime::System;
use cluster_runtime::config::Topology;
use cluster_runtime::memory::SharedAddr;
use pretty_assertions::assert_eq;

fn system(clusters: usize) -> System {
    System::new(Topology::new(clusters, 2).with_shared_memory_size(1024 * 1024))
}

fn operands() -> GemmOperands {
    GemmOperands::new(SharedAddr(0), SharedAddr(0), SharedAddr(0), None)
}

#[test_log::test]
fn uneven_tiling_is_rejected_before_launch() {
    let system = system(1);
    let problem = GemmProblem::new(10, 8, 8, Precision::Fp32).with_tiles(3, 1);

    assert!(matches!(
        launch_gemm(&system, &problem, operands()),
        Err(GemmSetupError::InvalidConfig(_))
    ));
}

#[test_log::test]
fn oversized_tiles_exhaust_local_memory() {
    let system = system(1);
    let problem = GemmProblem::new(256, 256, 256, Precision::Fp64);

    assert!(matches!(
        launch_gemm(&system, &problem, operands()),
        Err(GemmSetupError::LocalMemoryExhausted { .. })
    ));
}

#[test_log::test]
fn reduction_without_workspace_is_rejected() {
    let system = system(2);
    let problem = GemmProblem::new(8, 8, 8, Precision::Fp32).with_reduction_tiles(2);

    assert!(matches!(
        launch_gemm(&system, &problem, operands()),
        Err(GemmSetupError::InvalidConfig(_))
    ));
}

#[test_log::test]
fn broadcast_needs_full_quads() {
    let system = System::new(Topology::new(3, 2).with_clusters_per_quad(2));
    let problem = GemmProblem::new(6, 8, 8, Precision::Fp32)
        .with_tiles(3, 1)
        .with_broadcast_b(true);

    assert!(matches!(
        launch_gemm(&system, &problem, operands()),
        Err(GemmSetupError::Unavailable(_))
    ));
}

#[test_log::test]
fn corrupted_descriptor_fails_on_every_core() {
    let system = system(2);
    let problem = GemmProblem::new(8, 8, 8, Precision::Fp32);
    let mut args = GemmArgs::new(&problem, &operands());
    args.prec = 3;
    let addr = system.shared().alloc_from_slice(&[args]).unwrap();

    let statuses = system.launch(|core| gemm(core, addr));

    assert_eq!(statuses, vec![GEMM_INVALID_DESCRIPTOR; 6]);
}
