//! Vision Transformer for image classification.

use crate::error::VitError;
use crate::nn::dropout::Dropout;
use crate::nn::encoder_block::EncoderBlock;
use crate::nn::layer_norm::LayerNorm;
use crate::nn::linear::Linear;
use crate::nn::patch_embedding::PatchEmbedding;
use crate::nn::Module;
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Construction-time configuration. Every field is fixed when the model is
/// built; nothing here changes between forward calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitConfig {
    /// Height and width of the (square) input image.
    pub image_size: usize,
    /// Side length of each square tile; must divide `image_size`.
    pub patch_size: usize,
    pub in_channels: usize,
    pub n_classes: usize,
    /// Model width; must be divisible by `n_heads`.
    pub embed_dim: usize,
    /// Number of stacked encoder blocks.
    pub depth: usize,
    pub n_heads: usize,
    /// Feed-forward hidden-width multiplier.
    pub mlp_ratio: f32,
    /// Enables bias terms on the packed Q/K/V projection.
    pub qkv_bias: bool,
    /// Dropout on the token sequence right after the positional add.
    pub drop_rate: f32,
    /// Dropout on the attention weight matrix.
    pub attn_drop_rate: f32,
    /// Dropout after the attention output projection and inside the MLP.
    pub proj_drop_rate: f32,
    /// Seed for all parameter initialization and dropout masks.
    pub seed: u64,
}

impl Default for VitConfig {
    /// ViT-Base/16 on ImageNet-1k dimensions.
    fn default() -> Self {
        Self {
            image_size: 224,
            patch_size: 16,
            in_channels: 3,
            n_classes: 1000,
            embed_dim: 768,
            depth: 12,
            n_heads: 12,
            mlp_ratio: 4.0,
            qkv_bias: true,
            drop_rate: 0.0,
            attn_drop_rate: 0.0,
            proj_drop_rate: 0.0,
            seed: 42,
        }
    }
}

impl VitConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, VitError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// The full model: patch embedding, cls token, positional embedding, a stack
/// of encoder blocks, final norm and a linear classification head.
///
/// Inference-mode `forward` is a pure function of the input and the
/// parameters; no state is carried between calls.
pub struct VisionTransformer {
    patch_embed: PatchEmbedding,
    cls_token: Tensor,
    pos_embed: Tensor,
    pos_drop: Dropout,
    blocks: Vec<EncoderBlock>,
    norm: LayerNorm,
    head: Linear,
}

impl VisionTransformer {
    /// Builds the model. All randomness flows from `config.seed` through one
    /// RNG in a fixed order, so the same config always yields the same
    /// parameters. Fails fast if `image_size` is not divisible by
    /// `patch_size` or `embed_dim` is not divisible by `n_heads`.
    pub fn new(config: &VitConfig) -> Result<Self, VitError> {
        log::info!(
            "Building VisionTransformer: image_size={}, patch_size={}, embed_dim={}, depth={}, n_heads={}, n_classes={}",
            config.image_size,
            config.patch_size,
            config.embed_dim,
            config.depth,
            config.n_heads,
            config.n_classes
        );
        let mut rng = StdRng::seed_from_u64(config.seed);

        let patch_embed = PatchEmbedding::new(
            config.image_size,
            config.patch_size,
            config.in_channels,
            config.embed_dim,
            &mut rng,
        )?;
        let n_patches = patch_embed.n_patches();

        let cls_token = Tensor::uniform(vec![1, 1, config.embed_dim], -0.02, 0.02, &mut rng);
        let pos_embed = Tensor::uniform(
            vec![1, n_patches + 1, config.embed_dim],
            -0.02,
            0.02,
            &mut rng,
        );
        let pos_drop = Dropout::new(config.drop_rate, rng.gen())?;

        let mut blocks = Vec::with_capacity(config.depth);
        for _ in 0..config.depth {
            blocks.push(EncoderBlock::new(
                config.embed_dim,
                config.n_heads,
                config.mlp_ratio,
                config.qkv_bias,
                config.attn_drop_rate,
                config.proj_drop_rate,
                &mut rng,
            )?);
        }

        Ok(Self {
            patch_embed,
            cls_token,
            pos_embed,
            pos_drop,
            blocks,
            norm: LayerNorm::new(config.embed_dim),
            head: Linear::new(config.embed_dim, config.n_classes, &mut rng),
        })
    }

    /// Number of patches per image.
    pub fn n_patches(&self) -> usize {
        self.patch_embed.n_patches()
    }

    /// Full forward pass: `(B, C, S, S)` image to `(B, n_classes)` logits.
    /// `training` only controls whether the dropout layers are active.
    pub fn forward_t(&self, input: &Tensor, training: bool) -> Result<Tensor, VitError> {
        let batch = input.shape()[0];
        let embed_dim = self.cls_token.shape()[2];

        // (B, C, S, S) -> (B, n_patches, D)
        let x = self.patch_embed.forward(input)?;

        // Prepend the cls token, broadcast across the batch.
        let cls = self.cls_token.broadcast_to(vec![batch, 1, embed_dim]);
        let x = Tensor::concat(&[&cls, &x], 1);

        // One positional add, broadcast over the batch.
        let x = &x + &self.pos_embed;
        let mut x = self.pos_drop.forward_t(&x, training);

        for block in &self.blocks {
            x = block.forward_t(&x, training)?;
        }

        let x = self.norm.forward(&x)?;

        // The classification head reads only the cls-token representation.
        let cls_repr = x.select(1, 0);
        self.head.forward(&cls_repr)
    }
}

impl Module for VisionTransformer {
    fn forward(&self, input: &Tensor) -> Result<Tensor, VitError> {
        self.forward_t(input, false)
    }

    fn parameters(&self) -> Vec<Tensor> {
        let mut params = self.patch_embed.parameters();
        params.push(self.cls_token.clone());
        params.push(self.pos_embed.clone());
        for block in &self.blocks {
            params.extend(block.parameters());
        }
        params.extend(self.norm.parameters());
        params.extend(self.head.parameters());
        params
    }
}
