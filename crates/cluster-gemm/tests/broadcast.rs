use cluster_common::Precision;
use cluster_gemm::components::GemmProblem;
use cluster_gemm::harness::{Fill, GemmCase, GemmHarness};
use cluster_runtime::System;
use cluster_runtime::config::Topology;

fn system(clusters: usize, clusters_per_quad: usize) -> System {
    System::new(
        Topology::new(clusters, 2)
            .with_clusters_per_quad(clusters_per_quad)
            .with_shared_memory_size(4 * 1024 * 1024),
    )
}

#[test_log::test]
fn broadcast_b_matches_reference() {
    for (clusters, per_quad) in [(2, 2), (4, 4), (4, 2)] {
        let system = system(clusters, per_quad);
        let problem = GemmProblem::new(32, 24, 16, Precision::Fp32)
            .with_tiles(2 * clusters, 3)
            .with_broadcast_b(true);

        let outcome = GemmHarness::new(&system)
            .run(&GemmCase::new(problem, Fill::Random { seed: 17 }))
            .unwrap();

        assert_eq!(outcome.status(), 0, "{clusters} clusters in quads of {per_quad}");
    }
}

#[test_log::test]
fn broadcast_with_accumulation_and_transposed_b() {
    let system = system(4, 4);
    let problem = GemmProblem::new(16, 16, 16, Precision::Fp64)
        .with_tiles(4, 2)
        .with_transpose(false, true)
        .with_scaling(2.0, 1.0)
        .with_broadcast_b(true);

    let outcome = GemmHarness::new(&system)
        .run(&GemmCase::new(problem, Fill::Pattern))
        .unwrap();

    assert_eq!(outcome.status(), 0);
}
