pub use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::GemmElement;

/// Returns a random number generator seeded with the given value.
///
/// Every caller that needs reproducible operands goes through this function so that a seed
/// fully determines the generated data.
#[inline(always)]
pub fn get_seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Generates `len` elements uniformly distributed in `[low, high)`, rounded to the element type.
pub fn gen_uniform<E: GemmElement, R: Rng>(rng: &mut R, len: usize, low: f64, high: f64) -> Vec<E> {
    (0..len)
        .map(|_| E::from_f64(rng.random_range(low..high)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_values() {
        let lhs: Vec<f32> = gen_uniform(&mut get_seeded_rng(7), 16, -1.0, 1.0);
        let rhs: Vec<f32> = gen_uniform(&mut get_seeded_rng(7), 16, -1.0, 1.0);

        assert_eq!(lhs, rhs);
        assert!(lhs.iter().all(|v| (-1.0..1.0).contains(v)));
    }
}
