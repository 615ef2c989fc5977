use std::process::ExitCode;
use std::time::Instant;

use cluster_common::Precision;
use cluster_gemm::components::GemmProblem;
use cluster_gemm::harness::{Fill, GemmCase, GemmHarness};
use cluster_runtime::System;
use cluster_runtime::config::Topology;

/// Runs a GEMM case and reports its status: 0 on success, otherwise the number of elements
/// differing from the reference.
///
/// Without arguments, runs a 256x256x256 FP32 GEMM in 64x64 tiles on one cluster of four compute
/// cores. A TOML file describing a [GemmCase] can be given instead, it then runs on the topology
/// of `cluster.toml`.
fn main() -> ExitCode {
    env_logger::init();

    let (case, system) = match std::env::args().nth(1) {
        Some(path) => match read_case(&path) {
            Ok(case) => (case, System::from_config()),
            Err(err) => {
                log::error!("Can't read case {path}: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            let case = GemmCase::new(
                GemmProblem::new(256, 256, 256, Precision::Fp32).with_tiles(4, 4),
                Fill::Pattern,
            );
            let topology = Topology::new(1, 4)
                .with_tcdm_size(512 * 1024)
                .with_shared_memory_size(16 * 1024 * 1024);
            (case, System::new(topology))
        }
    };

    let start = Instant::now();
    let outcome = match GemmHarness::new(&system).run(&case) {
        Ok(outcome) => outcome,
        Err(err) => {
            log::error!("Can't run case: {err}");
            return ExitCode::FAILURE;
        }
    };

    let problem = &case.problem;
    println!(
        "{} {}x{}x{} ({}) took {:?}, status {}",
        problem.precision,
        problem.m,
        problem.n,
        problem.k,
        problem.strategy,
        start.elapsed(),
        outcome.status()
    );

    match outcome.passed() {
        true => ExitCode::SUCCESS,
        false => ExitCode::FAILURE,
    }
}

fn read_case(path: &str) -> Result<GemmCase, String> {
    let content = std::fs::read_to_string(path).map_err(|err| err.to_string())?;
    toml::from_str(&content).map_err(|err| err.to_string())
}
