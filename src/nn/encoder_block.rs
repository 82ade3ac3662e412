//! Pre-norm transformer encoder block.

use crate::error::VitError;
use crate::nn::attention::Attention;
use crate::nn::feed_forward::FeedForward;
use crate::nn::layer_norm::LayerNorm;
use crate::nn::Module;
use crate::tensor::Tensor;
use rand::rngs::StdRng;

/// One encoder block:
///
/// ```text
/// x = x + attn(norm1(x))
/// x = x + mlp(norm2(x))
/// ```
///
/// Normalization happens before each sublayer and both sublayers preserve the
/// input shape, so the residual additions need no reconciliation. Every block
/// owns its parameters; nothing is shared across blocks.
pub struct EncoderBlock {
    norm1: LayerNorm,
    attn: Attention,
    norm2: LayerNorm,
    mlp: FeedForward,
}

impl EncoderBlock {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dim: usize,
        n_heads: usize,
        mlp_ratio: f32,
        qkv_bias: bool,
        attn_p: f32,
        proj_p: f32,
        rng: &mut StdRng,
    ) -> Result<Self, VitError> {
        let hidden = (dim as f32 * mlp_ratio) as usize;
        Ok(Self {
            norm1: LayerNorm::new(dim),
            attn: Attention::new(dim, n_heads, qkv_bias, attn_p, proj_p, rng)?,
            norm2: LayerNorm::new(dim),
            mlp: FeedForward::new(dim, Some(hidden), Some(dim), proj_p, rng)?,
        })
    }

    pub fn forward_t(&self, input: &Tensor, training: bool) -> Result<Tensor, VitError> {
        let x = input + &self.attn.forward_t(&self.norm1.forward(input)?, training)?;
        let x = &x + &self.mlp.forward_t(&self.norm2.forward(&x)?, training)?;
        Ok(x)
    }
}

impl Module for EncoderBlock {
    fn forward(&self, input: &Tensor) -> Result<Tensor, VitError> {
        self.forward_t(input, false)
    }

    fn parameters(&self) -> Vec<Tensor> {
        let mut params = self.norm1.parameters();
        params.extend(self.attn.parameters());
        params.extend(self.norm2.parameters());
        params.extend(self.mlp.parameters());
        params
    }
}
