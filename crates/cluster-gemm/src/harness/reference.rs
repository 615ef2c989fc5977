use cluster_common::GemmElement;
use num_traits::Zero;

use super::CaseOperands;
use crate::components::GemmProblem;
use crate::components::tile::{Epilogue, MicroGemm};

/// The GEMM of `problem` computed with plain loops over whole matrices.
///
/// Applies the engine's arithmetic: every output element of a K slice sums its products in
/// ascending order in the accumulator type and is scaled then rounded once. Slices are then
/// summed with the same pairing as the reduction tree, so the result is bit-exact.
pub fn reference_gemm<E: GemmElement>(problem: &GemmProblem, operands: &CaseOperands<E>) -> Vec<E> {
    let (m, n, k) = (problem.m, problem.n, problem.k);
    let slices = problem.k_slices();
    let frac_k = problem.frac_k();

    let mut partials: Vec<Vec<E>> = (0..slices)
        .map(|slice| {
            let beta = if slice == 0 { problem.beta } else { 0.0 };
            let epilogue =
                Epilogue::<E>::new(&MicroGemm::new(m, n, frac_k, problem.alpha, beta, false));
            let reduction = slice * frac_k..(slice + 1) * frac_k;

            (0..m * n)
                .map(|idx| {
                    let (i, j) = (idx / n, idx % n);
                    let mut acc = E::Acc::zero();
                    for kk in reduction.clone() {
                        acc = acc + operands.a[i * k + kk].to_acc() * operands.b[kk * n + j].to_acc();
                    }
                    epilogue.apply(acc, operands.c[idx])
                })
                .collect()
        })
        .collect();

    let mut stride = 1;
    while stride < slices {
        for receiver in (0..slices).step_by(2 * stride) {
            if receiver + stride >= slices {
                continue;
            }
            let (left, right) = partials.split_at_mut(receiver + stride);
            for (acc, partial) in left[receiver].iter_mut().zip(&right[0]) {
                *acc = E::from_acc(acc.to_acc() + partial.to_acc());
            }
        }
        stride *= 2;
    }

    partials.swap_remove(0)
}
