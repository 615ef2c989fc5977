use cluster_common::GemmElement;
use num_traits::Zero;

use super::StridedLayout;

/// Shape and scalars of one micro-kernel call.
#[derive(new, Clone, Copy, Debug, PartialEq)]
pub struct MicroGemm {
    /// Rows of the output handled by the call.
    pub rows: usize,
    /// Columns of the output.
    pub cols: usize,
    /// Length of the dot products.
    pub reduction: usize,
    pub alpha: f64,
    /// The previous output is scaled by beta and added, unless beta is zero.
    pub beta: f64,
    /// Use the unrolled variant.
    pub fast_path: bool,
}

/// Computes `c = alpha * a * b + beta * c` over the operands described by the layouts.
///
/// Each output element sums `a(i, kk) * b(kk, j)` for ascending `kk` in the accumulator type of
/// `E`, multiplies by alpha, adds `beta * c(i, j)` when beta is non-zero and rounds once. The
/// fast path computes four columns at a time with the same order of operations, so both
/// variants produce the same bits.
pub fn micro_gemm<E: GemmElement>(
    params: &MicroGemm,
    a: &[E],
    a_layout: StridedLayout,
    b: &[E],
    b_layout: StridedLayout,
    c: &mut [E],
    c_layout: StridedLayout,
) {
    let epilogue = Epilogue::<E>::new(params);
    let mut first_col = 0;

    if params.fast_path {
        let unrolled = params.cols - params.cols % 4;
        for i in 0..params.rows {
            for j in (0..unrolled).step_by(4) {
                let mut acc = [E::Acc::zero(); 4];
                for kk in 0..params.reduction {
                    let lhs = a[a_layout.index(i, kk)].to_acc();
                    for (q, acc) in acc.iter_mut().enumerate() {
                        *acc = *acc + lhs * b[b_layout.index(kk, j + q)].to_acc();
                    }
                }
                for (q, acc) in acc.into_iter().enumerate() {
                    let index = c_layout.index(i, j + q);
                    c[index] = epilogue.apply(acc, c[index]);
                }
            }
        }
        first_col = unrolled;
    }

    for i in 0..params.rows {
        for j in first_col..params.cols {
            let mut acc = E::Acc::zero();
            for kk in 0..params.reduction {
                acc = acc + a[a_layout.index(i, kk)].to_acc() * b[b_layout.index(kk, j)].to_acc();
            }
            let index = c_layout.index(i, j);
            c[index] = epilogue.apply(acc, c[index]);
        }
    }
}

/// Element-wise `acc = acc + partial` in the accumulator type, over `rows` rows of `cols`.
pub fn micro_add<E: GemmElement>(
    rows: usize,
    cols: usize,
    partial: &[E],
    partial_layout: StridedLayout,
    acc: &mut [E],
    acc_layout: StridedLayout,
) {
    for i in 0..rows {
        for j in 0..cols {
            let index = acc_layout.index(i, j);
            let sum = acc[index].to_acc() + partial[partial_layout.index(i, j)].to_acc();
            acc[index] = E::from_acc(sum);
        }
    }
}

/// Scaling applied to every finished dot product.
pub struct Epilogue<E: GemmElement> {
    alpha: E::Acc,
    beta: Option<E::Acc>,
}

impl<E: GemmElement> Epilogue<E> {
    pub fn new(params: &MicroGemm) -> Self {
        Self {
            alpha: E::acc_from_f64(params.alpha),
            beta: (params.beta != 0.0).then(|| E::acc_from_f64(params.beta)),
        }
    }

    #[inline(always)]
    pub fn apply(&self, acc: E::Acc, previous: E) -> E {
        let scaled = acc * self.alpha;
        match self.beta {
            Some(beta) => E::from_acc(scaled + beta * previous.to_acc()),
            None => E::from_acc(scaled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_common::e5m2;
    use cluster_common::rand::{gen_uniform, get_seeded_rng};
    use half::f16;

    fn run<E: GemmElement>(params: &MicroGemm, trans_a: bool, trans_b: bool, seed: u64) -> Vec<E> {
        let mut rng = get_seeded_rng(seed);
        let a: Vec<E> = gen_uniform(&mut rng, params.rows * params.reduction, -2.0, 2.0);
        let b: Vec<E> = gen_uniform(&mut rng, params.reduction * params.cols, -2.0, 2.0);
        let mut c: Vec<E> = gen_uniform(&mut rng, params.rows * params.cols, -2.0, 2.0);
        let lda = if trans_a { params.rows } else { params.reduction };
        let ldb = if trans_b { params.reduction } else { params.cols };

        micro_gemm(
            params,
            &a,
            StridedLayout::from_ld(lda, trans_a),
            &b,
            StridedLayout::from_ld(ldb, trans_b),
            &mut c,
            StridedLayout::row_major(params.cols),
        );
        c
    }

    fn assert_fast_path_matches<E: GemmElement>() {
        for (trans_a, trans_b) in [(false, false), (true, false), (false, true), (true, true)] {
            let params = MicroGemm::new(5, 11, 7, 1.5, 1.0, false);
            let naive = run::<E>(&params, trans_a, trans_b, 3);
            let fast = run::<E>(&MicroGemm { fast_path: true, ..params }, trans_a, trans_b, 3);

            assert!(naive.iter().zip(fast.iter()).all(|(x, y)| x.bit_eq(*y)));
        }
    }

    #[test]
    fn fast_path_is_bit_identical() {
        assert_fast_path_matches::<f64>();
        assert_fast_path_matches::<f32>();
        assert_fast_path_matches::<f16>();
        assert_fast_path_matches::<e5m2>();
    }

    #[test]
    fn small_product() {
        // [1 2; 3 4] * [5 6; 7 8]
        let a = [1.0f64, 2.0, 3.0, 4.0];
        let b = [5.0f64, 6.0, 7.0, 8.0];
        let mut c = [1.0f64; 4];

        micro_gemm(
            &MicroGemm::new(2, 2, 2, 1.0, 0.0, false),
            &a,
            StridedLayout::row_major(2),
            &b,
            StridedLayout::row_major(2),
            &mut c,
            StridedLayout::row_major(2),
        );

        assert_eq!(c, [19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn beta_accumulates_onto_previous_output() {
        let a = [1.0f32, 2.0];
        let b = [3.0f32, 4.0];
        let mut c = [10.0f32];

        micro_gemm(
            &MicroGemm::new(1, 1, 2, 2.0, 1.0, true),
            &a,
            StridedLayout::row_major(2),
            &b,
            StridedLayout::row_major(1),
            &mut c,
            StridedLayout::row_major(1),
        );

        assert_eq!(c, [2.0 * 11.0 + 10.0]);
    }

    #[test]
    fn zero_rows_touch_nothing() {
        let mut c: [f32; 0] = [];

        micro_gemm::<f32>(
            &MicroGemm::new(0, 4, 4, 1.0, 0.0, true),
            &[],
            StridedLayout::row_major(4),
            &[],
            StridedLayout::row_major(4),
            &mut c,
            StridedLayout::row_major(4),
        );
    }

    #[test]
    fn add_sums_in_the_accumulator() {
        let partial = [f16::from_f32(0.5), f16::from_f32(1.0)];
        let mut acc = [f16::from_f32(1.0), f16::from_f32(2.0)];

        micro_add(
            1,
            2,
            &partial,
            StridedLayout::row_major(2),
            &mut acc,
            StridedLayout::row_major(2),
        );

        assert_eq!(acc, [f16::from_f32(1.5), f16::from_f32(3.0)]);
    }
}
