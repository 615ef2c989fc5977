use cluster_common::rand::{gen_uniform, get_seeded_rng};
use cluster_math::exp::{BATCH_SIZE, ExpContext, vexpf_naive, vexpf_pipelined};
use pretty_assertions::assert_eq;

const LEN: usize = 12288;

fn ulp_distance(lhs: f32, rhs: f32) -> u32 {
    (lhs.to_bits() as i32).abs_diff(rhs.to_bits() as i32)
}

fn ramp() -> Vec<f32> {
    (0..LEN).map(|i| i as f32 / LEN as f32).collect()
}

#[test_log::test]
fn pipelined_matches_naive_bits() {
    let context = ExpContext::new();
    let mut rng = get_seeded_rng(42);
    let input: Vec<f32> = gen_uniform(&mut rng, 64 * BATCH_SIZE, -80.0, 80.0);
    let mut naive = vec![0.0; input.len()];
    let mut pipelined = vec![0.0; input.len()];

    vexpf_naive(&context, &input, &mut naive).unwrap();
    vexpf_pipelined(&context, &input, &mut pipelined).unwrap();

    let naive: Vec<u32> = naive.iter().map(|y| y.to_bits()).collect();
    let pipelined: Vec<u32> = pipelined.iter().map(|y| y.to_bits()).collect();
    assert_eq!(naive, pipelined);
}

#[test_log::test]
fn ramp_is_within_one_ulp_of_exp() {
    let context = ExpContext::new();
    let input = ramp();
    let mut output = vec![0.0; LEN];

    vexpf_pipelined(&context, &input, &mut output).unwrap();

    for (x, y) in input.iter().zip(&output) {
        assert!(ulp_distance(*y, x.exp()) <= 1, "exp({x}) = {y}, expected {}", x.exp());
    }
}

#[test_log::test]
fn negative_and_large_inputs_are_within_one_ulp() {
    let context = ExpContext::new();
    let input: Vec<f32> = (-2000..2000).map(|i| i as f32 / 100.0).collect();
    let mut output = vec![0.0; input.len()];

    vexpf_naive(&context, &input, &mut output).unwrap();

    for (x, y) in input.iter().zip(&output) {
        assert!(ulp_distance(*y, x.exp()) <= 1, "exp({x}) = {y}, expected {}", x.exp());
    }
}

#[test_log::test]
fn empty_input_is_a_no_op() {
    let mut output: [f32; 0] = [];

    vexpf_pipelined(&ExpContext::new(), &[], &mut output).unwrap();
}
