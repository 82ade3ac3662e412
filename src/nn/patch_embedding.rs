//! Patch Embedding module for Vision Transformers.

use crate::error::VitError;
use crate::nn::linear::Linear;
use crate::nn::Module;
use crate::tensor::Tensor;
use ndarray::{s, Array3, Ix4};
use rand::rngs::StdRng;

/// Splits an image into non-overlapping `patch_size` x `patch_size` tiles and
/// projects each flattened tile to an `embed_dim` vector with one shared
/// linear map. Equivalent to a convolution with kernel size and stride both
/// equal to `patch_size`; the tile grid is emitted in row-major (raster)
/// order, giving a `(batch, n_patches, embed_dim)` sequence.
pub struct PatchEmbedding {
    image_size: usize,
    patch_size: usize,
    in_channels: usize,
    n_patches: usize,
    projection: Linear,
}

impl PatchEmbedding {
    pub fn new(
        image_size: usize,
        patch_size: usize,
        in_channels: usize,
        embed_dim: usize,
        rng: &mut StdRng,
    ) -> Result<Self, VitError> {
        if patch_size == 0 || image_size % patch_size != 0 {
            return Err(VitError::PatchSizeMismatch {
                image_size,
                patch_size,
            });
        }
        let grid = image_size / patch_size;
        let n_patches = grid * grid;
        log::debug!(
            "Initializing PatchEmbedding with image_size={}, patch_size={}, n_patches={}",
            image_size,
            patch_size,
            n_patches
        );
        let projection = Linear::new(in_channels * patch_size * patch_size, embed_dim, rng);
        Ok(Self {
            image_size,
            patch_size,
            in_channels,
            n_patches,
            projection,
        })
    }

    /// Number of patches per image, `(image_size / patch_size)^2`.
    pub fn n_patches(&self) -> usize {
        self.n_patches
    }

    /// Extracts tiles into a `(batch, n_patches, C * P * P)` tensor. Each tile
    /// is flattened channel-major (channel, then tile row, then tile column),
    /// the layout a strided convolution kernel would consume.
    fn extract_patches(&self, input: &Tensor) -> Tensor {
        let data = input.data();
        // Shape is validated by `forward` before this runs.
        let images = data.view().into_dimensionality::<Ix4>().unwrap();
        let (b, p) = (images.shape()[0], self.patch_size);
        let grid = self.image_size / p;
        let patch_len = self.in_channels * p * p;

        let mut patches = Array3::<f32>::zeros((b, self.n_patches, patch_len));
        for bi in 0..b {
            for gy in 0..grid {
                for gx in 0..grid {
                    let tile = images.slice(s![
                        bi,
                        ..,
                        gy * p..(gy + 1) * p,
                        gx * p..(gx + 1) * p
                    ]);
                    let mut row = patches.slice_mut(s![bi, gy * grid + gx, ..]);
                    for (dst, src) in row.iter_mut().zip(tile.iter()) {
                        *dst = *src;
                    }
                }
            }
        }
        Tensor::from_data(patches.into_dyn())
    }
}

impl Module for PatchEmbedding {
    fn forward(&self, input: &Tensor) -> Result<Tensor, VitError> {
        let shape = input.shape();
        let expected = [self.in_channels, self.image_size, self.image_size];
        if shape.len() != 4 || shape[1..] != expected {
            return Err(VitError::ShapeMismatch {
                expected: format!(
                    "(batch, {}, {}, {})",
                    self.in_channels, self.image_size, self.image_size
                ),
                actual: shape,
            });
        }
        let patches = self.extract_patches(input);
        self.projection.forward(&patches)
    }

    fn parameters(&self) -> Vec<Tensor> {
        self.projection.parameters()
    }
}
