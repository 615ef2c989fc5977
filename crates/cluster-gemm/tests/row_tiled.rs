use cluster_common::Precision;
use cluster_gemm::components::{GemmOperands, GemmProblem};
use cluster_gemm::harness::{Fill, GemmCase, GemmHarness};
use cluster_gemm::launch_gemm;
use cluster_runtime::System;
use cluster_runtime::config::Topology;
use pretty_assertions::assert_eq;

fn system(clusters: usize, compute_cores: usize) -> System {
    System::new(Topology::new(clusters, compute_cores).with_shared_memory_size(4 * 1024 * 1024))
}

fn assert_passes(system: &System, problem: GemmProblem, fill: Fill) {
    let outcome = GemmHarness::new(system)
        .run(&GemmCase::new(problem.clone(), fill))
        .unwrap();

    assert_eq!(outcome.engine_status, 0, "{problem:?}");
    assert_eq!(outcome.mismatches, 0, "{problem:?}");
}

#[test_log::test]
fn square_fp32_on_one_cluster_matches_triple_loop() {
    let system = System::new(
        Topology::new(1, 4)
            .with_tcdm_size(512 * 1024)
            .with_shared_memory_size(4 * 1024 * 1024),
    );
    let problem = GemmProblem::new(256, 256, 256, Precision::Fp32).with_tiles(4, 4);

    let outcome = GemmHarness::new(&system)
        .run(&GemmCase::new(problem, Fill::Pattern))
        .unwrap();

    assert_eq!(outcome.status(), 0);
    // Every partial sum is an integer below 2^24, so f32 is exact here.
    for i in 0..256 {
        for j in 0..256 {
            let expected: f64 = (0..256)
                .map(|kk| (i as f64 - kk as f64) * ((kk + j) % 7) as f64)
                .sum();
            assert_eq!(outcome.output[i * 256 + j], expected, "C[{i}][{j}]");
        }
    }
}

#[test_log::test]
fn every_precision_matches_reference() {
    let system = system(2, 3);

    for precision in Precision::ALL {
        let problem = GemmProblem::new(32, 32, 32, precision).with_tiles(2, 2);
        assert_passes(&system, problem, Fill::Random { seed: 7 });
    }
}

#[test_log::test]
fn transposed_operands_match_reference() {
    let system = system(2, 2);

    for (trans_a, trans_b) in [(false, true), (true, false), (true, true)] {
        let problem = GemmProblem::new(16, 24, 8, Precision::Fp64)
            .with_tiles(4, 3)
            .with_transpose(trans_a, trans_b);
        assert_passes(&system, problem, Fill::Random { seed: 11 });
    }
}

#[test_log::test]
fn beta_accumulates_onto_previous_output() {
    let system = system(1, 4);

    for (alpha, beta) in [(1.0, 1.0), (0.5, 2.0), (-1.0, -0.25)] {
        let problem = GemmProblem::new(16, 16, 16, Precision::Fp32)
            .with_tiles(2, 2)
            .with_scaling(alpha, beta);
        assert_passes(&system, problem, Fill::Pattern);
    }
}

#[test_log::test]
fn fast_path_gives_same_bits() {
    let system = system(1, 3);
    let problem = GemmProblem::new(12, 20, 16, Precision::Fp16)
        .with_tiles(2, 2)
        .with_scaling(1.0, 0.5);
    let harness = GemmHarness::new(&system);

    let naive = harness
        .run(&GemmCase::new(problem.clone(), Fill::Random { seed: 3 }))
        .unwrap();
    let fast = harness
        .run(&GemmCase::new(problem.with_fast_path(true), Fill::Random { seed: 3 }))
        .unwrap();

    assert_eq!(fast.status(), 0);
    assert_eq!(fast.output, naive.output);
}

#[test_log::test]
fn tiles_with_fewer_rows_than_compute_cores() {
    let system = system(1, 8);
    let problem = GemmProblem::new(12, 8, 8, Precision::Fp64).with_tiles(4, 2);

    assert_passes(&system, problem, Fill::Pattern);
}

#[test_log::test]
fn clusters_own_several_row_tiles() {
    let system = system(3, 2);

    // Seven row tiles over three clusters: 3, 2 and 2 each.
    let problem = GemmProblem::new(28, 16, 8, Precision::Fp32)
        .with_tiles(7, 2)
        .with_scaling(1.0, 1.0);
    assert_passes(&system, problem, Fill::Random { seed: 21 });
}

#[test_log::test]
fn idle_clusters_still_take_part_in_barriers() {
    let system = system(4, 2);
    let problem = GemmProblem::new(8, 8, 8, Precision::Fp64).with_tiles(2, 1);

    assert_passes(&system, problem, Fill::Pattern);
}

#[test_log::test]
fn repeated_launches_give_same_output() {
    let system = system(2, 2);
    let shared = system.shared();
    let problem = GemmProblem::new(16, 16, 16, Precision::Fp32).with_tiles(2, 2);
    let a = shared.alloc_from_slice(&vec![0.25f32; 256]).unwrap();
    let b = shared.alloc_from_slice(&vec![2.0f32; 256]).unwrap();
    let c = shared.alloc_from_slice(&vec![f32::NAN; 256]).unwrap();
    let operands = GemmOperands::new(a, b, c, None);

    assert_eq!(launch_gemm(&system, &problem, operands), Ok(0));
    let first = shared.read::<f32>(c, 256);
    assert_eq!(launch_gemm(&system, &problem, operands), Ok(0));

    assert_eq!(first, vec![8.0; 256]);
    assert_eq!(shared.read::<f32>(c, 256), first);
}
