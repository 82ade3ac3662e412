//! Multi-head scaled dot-product self-attention.

use crate::error::VitError;
use crate::nn::dropout::Dropout;
use crate::nn::linear::Linear;
use crate::nn::Module;
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::Rng;

/// Self-attention over a `(batch, tokens, dim)` sequence.
///
/// Queries, keys and values come from one packed `dim -> 3 * dim` projection,
/// are split across `n_heads` subspaces of `dim / n_heads` features each, and
/// every head attends over the full token sequence. Output shape always equals
/// input shape.
pub struct Attention {
    dim: usize,
    n_heads: usize,
    head_dim: usize,
    scale: f32,
    qkv: Linear,
    proj: Linear,
    attn_drop: Dropout,
    proj_drop: Dropout,
}

impl Attention {
    pub fn new(
        dim: usize,
        n_heads: usize,
        qkv_bias: bool,
        attn_p: f32,
        proj_p: f32,
        rng: &mut StdRng,
    ) -> Result<Self, VitError> {
        if n_heads == 0 || dim % n_heads != 0 {
            return Err(VitError::HeadCountMismatch { dim, n_heads });
        }
        let head_dim = dim / n_heads;
        log::debug!(
            "Initializing Attention with dim={}, n_heads={}, head_dim={}",
            dim,
            n_heads,
            head_dim
        );
        let qkv = if qkv_bias {
            Linear::new(dim, dim * 3, rng)
        } else {
            Linear::without_bias(dim, dim * 3, rng)
        };
        let proj = Linear::new(dim, dim, rng);
        // Dropout seeds are always drawn, so models built from the same seed
        // get identical weights regardless of the configured probabilities.
        let attn_drop = Dropout::new(attn_p, rng.gen())?;
        let proj_drop = Dropout::new(proj_p, rng.gen())?;
        Ok(Self {
            dim,
            n_heads,
            head_dim,
            scale: (head_dim as f32).powf(-0.5),
            qkv,
            proj,
            attn_drop,
            proj_drop,
        })
    }

    /// Checks the input is a token sequence whose feature width matches the
    /// configured model dimension. This must fail before any compute happens.
    fn validate(&self, input: &Tensor) -> Result<(usize, usize), VitError> {
        let shape = input.shape();
        if shape.len() != 3 {
            return Err(VitError::ShapeMismatch {
                expected: format!("(batch, tokens, {})", self.dim),
                actual: shape,
            });
        }
        if shape[2] != self.dim {
            return Err(VitError::DimensionMismatch {
                expected: self.dim,
                actual: shape[2],
            });
        }
        Ok((shape[0], shape[1]))
    }

    /// Reshapes `(B, T, D)` into `(B * H, T, head_dim)` so per-head attention
    /// runs through the batched matmul path.
    fn split_heads(&self, x: &Tensor, b: usize, t: usize) -> Tensor {
        x.reshape(vec![b, t, self.n_heads, self.head_dim])
            .transpose(1, 2)
            .reshape(vec![b * self.n_heads, t, self.head_dim])
    }

    /// Softmax-normalized attention weights for an input sequence, shaped
    /// `(batch, n_heads, tokens, tokens)`. Rows sum to one. Useful for
    /// inspecting what the model attends to; the forward pass computes the
    /// same quantity before the value-weighted sum.
    pub fn attention_weights(&self, input: &Tensor) -> Result<Tensor, VitError> {
        let (b, t) = self.validate(input)?;
        let (q, k, _v) = self.project_qkv(input, b, t)?;
        let scores = q.matmul(&k.transpose(1, 2)) * self.scale;
        Ok(scores
            .softmax(2)
            .reshape(vec![b, self.n_heads, t, t]))
    }

    fn project_qkv(
        &self,
        input: &Tensor,
        b: usize,
        t: usize,
    ) -> Result<(Tensor, Tensor, Tensor), VitError> {
        let qkv = self.qkv.forward(input)?.reshape(vec![b, t, 3, self.dim]);
        let q = self.split_heads(&qkv.select(2, 0), b, t);
        let k = self.split_heads(&qkv.select(2, 1), b, t);
        let v = self.split_heads(&qkv.select(2, 2), b, t);
        Ok((q, k, v))
    }

    pub fn forward_t(&self, input: &Tensor, training: bool) -> Result<Tensor, VitError> {
        let (b, t) = self.validate(input)?;

        let (q, k, v) = self.project_qkv(input, b, t)?;

        // (B*H, T, hd) x (B*H, hd, T) -> (B*H, T, T)
        let scores = q.matmul(&k.transpose(1, 2)) * self.scale;
        let attn = scores.softmax(2);
        let attn = self.attn_drop.forward_t(&attn, training);

        // (B*H, T, T) x (B*H, T, hd) -> (B*H, T, hd), then reassemble heads.
        let context = attn
            .matmul(&v)
            .reshape(vec![b, self.n_heads, t, self.head_dim])
            .transpose(1, 2)
            .reshape(vec![b, t, self.dim]);

        let out = self.proj.forward(&context)?;
        Ok(self.proj_drop.forward_t(&out, training))
    }
}

impl Module for Attention {
    fn forward(&self, input: &Tensor) -> Result<Tensor, VitError> {
        self.forward_t(input, false)
    }

    fn parameters(&self) -> Vec<Tensor> {
        let mut params = self.qkv.parameters();
        params.extend(self.proj.parameters());
        params
    }
}
