//! Error taxonomy for model construction and the forward pass.
//!
//! Every variant is a configuration or shape fault: there is no recoverable
//! error path inside the forward computation, so callers either get a tensor
//! of the documented shape or one of these errors before any output exists.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VitError {
    /// The image grid cannot be tiled exactly by the configured patch size.
    #[error("image size {image_size} is not divisible by patch size {patch_size}")]
    PatchSizeMismatch { image_size: usize, patch_size: usize },

    /// The embedding dimension cannot be split evenly across attention heads.
    #[error("embedding dimension {dim} is not divisible by {n_heads} attention heads")]
    HeadCountMismatch { dim: usize, n_heads: usize },

    /// An input's feature dimension disagrees with the configured model dimension.
    #[error("input feature dimension {actual} does not match configured dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An input tensor has the wrong rank or extents.
    #[error("expected input of shape {expected}, got {actual:?}")]
    ShapeMismatch { expected: String, actual: Vec<usize> },

    /// A dropout probability outside `[0, 1)`.
    #[error("dropout probability {p} is outside [0, 1)")]
    InvalidDropout { p: f32 },

    #[error("failed to read config file: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
