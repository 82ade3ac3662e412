// Tests for multi-head self-attention: shape preservation, softmax
// normalization and the fail-fast dimension checks.

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rusty_vit::error::VitError;
use rusty_vit::nn::attention::Attention;
use rusty_vit::nn::Module;
use rusty_vit::tensor::Tensor;

#[test]
fn output_preserves_input_shape() {
    let mut rng = StdRng::seed_from_u64(0);
    for (t, d, heads) in [(5, 64, 4), (17, 64, 8), (1, 32, 2)] {
        let attn = Attention::new(d, heads, true, 0.0, 0.0, &mut rng).unwrap();
        let input = Tensor::uniform(vec![2, t, d], -1.0, 1.0, &mut rng);
        let out = attn.forward(&input).unwrap();
        assert_eq!(out.shape(), vec![2, t, d]);
    }
}

#[test]
fn attention_weights_rows_sum_to_one() {
    let mut rng = StdRng::seed_from_u64(1);
    let attn = Attention::new(64, 4, true, 0.0, 0.0, &mut rng).unwrap();
    let input = Tensor::uniform(vec![2, 5, 64], -1.0, 1.0, &mut rng);

    let weights = attn.attention_weights(&input).unwrap();
    assert_eq!(weights.shape(), vec![2, 4, 5, 5]);

    let sums = weights.sum_axis(3, false);
    for &v in sums.data().iter() {
        assert_relative_eq!(v, 1.0, epsilon = 1e-5);
    }
}

#[test]
fn qkv_bias_flag_does_not_change_shapes() {
    let mut rng = StdRng::seed_from_u64(2);
    let biased = Attention::new(32, 4, true, 0.0, 0.0, &mut rng).unwrap();
    let bias_free = Attention::new(32, 4, false, 0.0, 0.0, &mut rng).unwrap();
    let input = Tensor::uniform(vec![3, 9, 32], -1.0, 1.0, &mut rng);
    assert_eq!(biased.forward(&input).unwrap().shape(), vec![3, 9, 32]);
    assert_eq!(bias_free.forward(&input).unwrap().shape(), vec![3, 9, 32]);
    // The bias-free projection carries one parameter tensor fewer.
    assert_eq!(biased.parameters().len(), bias_free.parameters().len() + 1);
}

#[test]
fn mismatched_feature_dimension_fails_before_compute() {
    let mut rng = StdRng::seed_from_u64(0);
    let attn = Attention::new(64, 4, true, 0.0, 0.0, &mut rng).unwrap();
    let input = Tensor::zeros(vec![1, 4, 32]);
    assert!(matches!(
        attn.forward(&input),
        Err(VitError::DimensionMismatch {
            expected: 64,
            actual: 32
        })
    ));
}

#[test]
fn indivisible_head_count_is_a_construction_error() {
    let mut rng = StdRng::seed_from_u64(0);
    assert!(matches!(
        Attention::new(10, 3, true, 0.0, 0.0, &mut rng),
        Err(VitError::HeadCountMismatch {
            dim: 10,
            n_heads: 3
        })
    ));
}

#[test]
fn dropout_probabilities_do_not_change_output_shape() {
    let mut rng = StdRng::seed_from_u64(4);
    let attn = Attention::new(32, 4, true, 0.3, 0.3, &mut rng).unwrap();
    let input = Tensor::uniform(vec![2, 6, 32], -1.0, 1.0, &mut rng);
    assert_eq!(attn.forward_t(&input, true).unwrap().shape(), vec![2, 6, 32]);
    assert_eq!(attn.forward_t(&input, false).unwrap().shape(), vec![2, 6, 32]);
}
