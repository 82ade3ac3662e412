//! Layer Normalization module.

use crate::error::VitError;
use crate::nn::Module;
use crate::tensor::Tensor;

/// Normalizes each token over the feature axis to zero mean and unit variance,
/// then applies a learnable affine transformation.
pub struct LayerNorm {
    gamma: Tensor, // Learnable gain
    beta: Tensor,  // Learnable bias
    epsilon: f32,
}

impl LayerNorm {
    /// Creates a new LayerNorm module.
    /// `dim` is the size of the last dimension (the feature dimension).
    pub fn new(dim: usize) -> Self {
        log::debug!("Initializing LayerNorm with dim={}", dim);
        Self {
            // Gain starts at one and bias at zero, the standard starting points.
            gamma: Tensor::ones(vec![dim]),
            beta: Tensor::zeros(vec![dim]),
            epsilon: 1e-5, // Small value to prevent division by zero.
        }
    }
}

impl Module for LayerNorm {
    fn forward(&self, input: &Tensor) -> Result<Tensor, VitError> {
        // Normalize over the last dimension (the feature dimension, e.g. embed_dim).
        let axis = input.shape().len() - 1;

        let mean = input.mean_axis(axis, true);
        let variance = input.var_axis(axis, true);

        // (x - mean) / sqrt(variance + epsilon)
        let normalized = (input - &mean) / &((variance + self.epsilon).sqrt());

        // Apply scale (gamma) and shift (beta), broadcast over the leading axes.
        Ok(&(&normalized * &self.gamma) + &self.beta)
    }

    fn parameters(&self) -> Vec<Tensor> {
        vec![self.gamma.clone(), self.beta.clone()]
    }
}
