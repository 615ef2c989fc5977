use cluster_common::{GemmElement, Precision, e5m2};
use cluster_runtime::System;
use half::f16;
use serde::{Deserialize, Serialize};

use super::{Fill, reference_gemm};
use crate::components::stage::Operand;
use crate::components::{GemmOperands, GemmProblem, GemmSetupError};
use crate::launch_gemm;

/// A problem and the data it runs on.
#[derive(new, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GemmCase {
    pub problem: GemmProblem,
    #[serde(default)]
    pub fill: Fill,
}

/// Result of running one [GemmCase].
#[derive(Clone, Debug, PartialEq)]
pub struct GemmOutcome {
    /// Status returned by the engine.
    pub engine_status: i32,
    /// Output elements whose bits differ from the reference.
    pub mismatches: usize,
    /// What the engine wrote into C, widened.
    pub output: Vec<f64>,
    /// The reference result, widened.
    pub expected: Vec<f64>,
}

impl GemmOutcome {
    /// The engine status when it failed, otherwise the number of mismatching elements.
    pub fn status(&self) -> i32 {
        match self.engine_status {
            0 => i32::try_from(self.mismatches).unwrap_or(i32::MAX),
            status => status,
        }
    }

    pub fn passed(&self) -> bool {
        self.status() == 0
    }
}

/// Runs GEMM cases on a system and checks them against [reference_gemm].
#[derive(new)]
pub struct GemmHarness<'a> {
    system: &'a System,
}

impl GemmHarness<'_> {
    /// Runs `case` on a freshly reset shared memory.
    pub fn run(&self, case: &GemmCase) -> Result<GemmOutcome, GemmSetupError> {
        match case.problem.precision {
            Precision::Fp64 => self.run_typed::<f64>(case),
            Precision::Fp32 => self.run_typed::<f32>(case),
            Precision::Fp16 => self.run_typed::<f16>(case),
            Precision::Fp8 => self.run_typed::<e5m2>(case),
        }
    }

    fn run_typed<E: GemmElement>(&self, case: &GemmCase) -> Result<GemmOutcome, GemmSetupError> {
        let problem = &case.problem;
        problem.validate(self.system.topology())?;

        let shared = self.system.shared();
        shared.reset();

        let data = case.fill.operands::<E>(problem);
        let a = shared.alloc_from_slice(&data.stored(problem, Operand::A))?;
        let b = shared.alloc_from_slice(&data.stored(problem, Operand::B))?;
        let c = shared.alloc_from_slice(&data.stored(problem, Operand::C))?;
        let workspace = match problem.workspace_size() {
            0 => None,
            size => Some(shared.alloc(size)?),
        };

        let engine_status = launch_gemm(self.system, problem, GemmOperands::new(a, b, c, workspace))?;

        let output = shared.read::<E>(c, problem.m * problem.n);
        let expected = reference_gemm(problem, &data);
        let mismatches = output
            .iter()
            .zip(&expected)
            .filter(|(output, expected)| !output.bit_eq(**expected))
            .count();

        if mismatches > 0 {
            log::warn!(
                "{mismatches} of {} elements differ from the reference",
                expected.len()
            );
        }

        Ok(GemmOutcome {
            engine_status,
            mismatches,
            output: output.iter().map(|value| value.to_f64()).collect(),
            expected: expected.iter().map(|value| value.to_f64()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_runtime::config::Topology;

    #[test_log::test]
    fn case_deserializes_with_default_fill() {
        let case: GemmCase = toml::from_str(
            r#"
            [problem]
            m = 8
            n = 8
            k = 8
            precision = "fp64"
            "#,
        )
        .unwrap();

        assert_eq!(case.fill, Fill::Pattern);
        assert_eq!(case.problem.m_tiles, 1);
    }

    #[test_log::test]
    fn status_reports_mismatches_when_engine_succeeds() {
        let outcome = GemmOutcome {
            engine_status: 0,
            mismatches: 3,
            output: Vec::new(),
            expected: Vec::new(),
        };

        assert_eq!(outcome.status(), 3);
        assert!(!outcome.passed());
    }

    #[test_log::test]
    fn small_case_passes() {
        let system = System::new(Topology::new(1, 2));
        let harness = GemmHarness::new(&system);
        let case = GemmCase::new(
            GemmProblem::new(8, 8, 8, Precision::Fp64).with_tiles(2, 2),
            Fill::Pattern,
        );

        let outcome = harness.run(&case).unwrap();

        assert_eq!(outcome.status(), 0);
        assert_eq!(outcome.output, outcome.expected);
    }
}
