//! Smoke test: build a small Vision Transformer, run one forward pass on a
//! random image, print the output shape.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rusty_vit::error::VitError;
use rusty_vit::models::vit::{VisionTransformer, VitConfig};
use rusty_vit::nn::Module;
use rusty_vit::tensor::Tensor;

fn main() -> Result<(), VitError> {
    let config = VitConfig {
        image_size: 64,
        patch_size: 8,
        n_classes: 10,
        embed_dim: 128,
        depth: 4,
        n_heads: 8,
        ..Default::default()
    };
    let model = VisionTransformer::new(&config)?;
    println!(
        "built model: {} patches, {} parameter tensors",
        model.n_patches(),
        model.parameters().len()
    );

    let mut rng = StdRng::seed_from_u64(0);
    let image = Tensor::uniform(vec![1, config.in_channels, 64, 64], -1.0, 1.0, &mut rng);
    let logits = model.forward(&image)?;
    println!("logits shape: {:?}", logits.shape());
    Ok(())
}
