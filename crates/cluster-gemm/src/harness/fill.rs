use cluster_common::GemmElement;
use cluster_common::rand::{gen_uniform, get_seeded_rng};
use serde::{Deserialize, Serialize};

use crate::components::GemmProblem;
use crate::components::stage::Operand;

/// How the operands of a test case are filled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fill {
    /// `A[i][j] = i - j`, `B[i][j] = (i + j) mod 7` and `C[i][j] = (i + 2j) mod 3`.
    #[default]
    Pattern,
    /// Uniform values in `[-1, 1)` from a seeded generator.
    Random { seed: u64 },
}

/// The logical operands of a case, row-major and untransposed.
#[derive(Clone, Debug, PartialEq)]
pub struct CaseOperands<E> {
    /// `M x K`.
    pub a: Vec<E>,
    /// `K x N`.
    pub b: Vec<E>,
    /// `M x N`, the previous content of the output.
    pub c: Vec<E>,
}

impl Fill {
    /// Generates the operands of `problem`. C is zero unless beta is non-zero.
    pub fn operands<E: GemmElement>(&self, problem: &GemmProblem) -> CaseOperands<E> {
        let (m, n, k) = (problem.m, problem.n, problem.k);
        let with_c = problem.beta != 0.0;

        match *self {
            Fill::Pattern => CaseOperands {
                a: pattern(m, k, |i, j| i as f64 - j as f64),
                b: pattern(k, n, |i, j| ((i + j) % 7) as f64),
                c: pattern(m, n, |i, j| match with_c {
                    true => ((i + 2 * j) % 3) as f64,
                    false => 0.0,
                }),
            },
            Fill::Random { seed } => {
                let mut rng = get_seeded_rng(seed);
                let a = gen_uniform(&mut rng, m * k, -1.0, 1.0);
                let b = gen_uniform(&mut rng, k * n, -1.0, 1.0);
                let c = match with_c {
                    true => gen_uniform(&mut rng, m * n, -1.0, 1.0),
                    false => vec![E::from_f64(0.0); m * n],
                };
                CaseOperands { a, b, c }
            }
        }
    }
}

impl<E: GemmElement> CaseOperands<E> {
    /// The operand as the engine expects it in memory: transposed when the problem says so.
    pub fn stored(&self, problem: &GemmProblem, operand: Operand) -> Vec<E> {
        match operand {
            Operand::A if problem.trans_a => transpose(&self.a, problem.m, problem.k),
            Operand::A => self.a.clone(),
            Operand::B if problem.trans_b => transpose(&self.b, problem.k, problem.n),
            Operand::B => self.b.clone(),
            Operand::C => self.c.clone(),
        }
    }
}

fn pattern<E: GemmElement>(rows: usize, cols: usize, value: impl Fn(usize, usize) -> f64) -> Vec<E> {
    (0..rows * cols)
        .map(|idx| E::from_f64(value(idx / cols, idx % cols)))
        .collect()
}

/// Transposes a row-major `rows x cols` matrix.
fn transpose<E: Copy>(data: &[E], rows: usize, cols: usize) -> Vec<E> {
    (0..rows * cols)
        .map(|idx| data[(idx % rows) * cols + idx / rows])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_common::Precision;

    #[test]
    fn pattern_matches_its_formula() {
        let problem = GemmProblem::new(3, 4, 5, Precision::Fp64).with_scaling(1.0, 1.0);
        let operands = Fill::Pattern.operands::<f64>(&problem);

        assert_eq!(operands.a[2 * 5 + 4], -2.0);
        assert_eq!(operands.b[4 * 4 + 3], 0.0);
        assert_eq!(operands.c[2 * 4 + 1], 1.0);
    }

    #[test]
    fn output_is_zero_without_beta() {
        let problem = GemmProblem::new(2, 2, 2, Precision::Fp32);
        let operands = Fill::Random { seed: 5 }.operands::<f32>(&problem);

        assert!(operands.c.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn transposed_operands_are_stored_column_major() {
        let problem = GemmProblem::new(2, 2, 3, Precision::Fp64).with_transpose(true, false);
        let operands = Fill::Pattern.operands::<f64>(&problem);
        let stored = operands.stored(&problem, Operand::A);

        // A is 2x3, stored as its 3x2 transpose.
        assert_eq!(stored, vec![0.0, 1.0, -1.0, 0.0, -2.0, -1.0]);
    }
}
