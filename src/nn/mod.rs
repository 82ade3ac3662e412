pub mod attention;
pub mod dropout;
pub mod encoder_block;
pub mod feed_forward;
pub mod layer_norm;
pub mod linear;
pub mod patch_embedding;

use crate::error::VitError;
use crate::tensor::Tensor;

/// A trait for a neural network module.
pub trait Module {
    /// Performs an inference-mode forward pass on the module.
    ///
    /// Shape or dimension faults surface as [`VitError`] before any output is
    /// produced; there is no partially-computed result.
    fn forward(&self, input: &Tensor) -> Result<Tensor, VitError>;

    /// Returns a vector of all learnable parameters in the module.
    ///
    /// The returned handles share storage with the module, so an external
    /// training facility can update weights in place through them.
    fn parameters(&self) -> Vec<Tensor>;
}
