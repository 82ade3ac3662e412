// Tests for patch extraction and projection: tiling, raster order and
// construction-time validation.

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rusty_vit::error::VitError;
use rusty_vit::nn::patch_embedding::PatchEmbedding;
use rusty_vit::nn::Module;
use rusty_vit::tensor::Tensor;

#[test]
fn output_is_a_patch_sequence() {
    let mut rng = StdRng::seed_from_u64(0);
    let embed = PatchEmbedding::new(32, 8, 3, 64, &mut rng).unwrap();
    assert_eq!(embed.n_patches(), 16);

    let image = Tensor::uniform(vec![2, 3, 32, 32], -1.0, 1.0, &mut rng);
    let out = embed.forward(&image).unwrap();
    assert_eq!(out.shape(), vec![2, 16, 64]);
}

#[test]
fn n_patches_is_grid_squared() {
    let mut rng = StdRng::seed_from_u64(0);
    let embed = PatchEmbedding::new(224, 16, 3, 768, &mut rng).unwrap();
    assert_eq!(embed.n_patches(), 14 * 14);
}

#[test]
fn constant_image_gives_identical_patch_vectors() {
    // Every tile of a constant image is the same, and the projection is
    // shared, so every sequence position must hold the same vector.
    let mut rng = StdRng::seed_from_u64(3);
    let embed = PatchEmbedding::new(16, 4, 1, 8, &mut rng).unwrap();
    let image = Tensor::ones(vec![1, 1, 16, 16]);
    let out = embed.forward(&image).unwrap();
    let data = out.data();
    for patch in 1..16 {
        for feature in 0..8 {
            assert_relative_eq!(
                data[[0, patch, feature]],
                data[[0, 0, feature]],
                epsilon = 1e-6
            );
        }
    }
}

#[test]
fn indivisible_patch_size_is_a_construction_error() {
    let mut rng = StdRng::seed_from_u64(0);
    let result = PatchEmbedding::new(30, 7, 3, 64, &mut rng);
    assert!(matches!(
        result,
        Err(VitError::PatchSizeMismatch {
            image_size: 30,
            patch_size: 7
        })
    ));
}

#[test]
fn wrong_input_shape_is_rejected() {
    let mut rng = StdRng::seed_from_u64(0);
    let embed = PatchEmbedding::new(32, 8, 3, 64, &mut rng).unwrap();

    // Rank-3 input.
    let bad_rank = Tensor::zeros(vec![3, 32, 32]);
    assert!(matches!(
        embed.forward(&bad_rank),
        Err(VitError::ShapeMismatch { .. })
    ));

    // Right rank, wrong spatial extent.
    let bad_size = Tensor::zeros(vec![1, 3, 64, 64]);
    assert!(matches!(
        embed.forward(&bad_size),
        Err(VitError::ShapeMismatch { .. })
    ));
}
