//! A position-wise feed-forward network.

use crate::error::VitError;
use crate::nn::dropout::Dropout;
use crate::nn::linear::Linear;
use crate::nn::Module;
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::Rng;

/// Two linear layers with a GELU between, applied independently at every
/// token position. Hidden and output widths default to the input width when
/// not given; the model uses `embed_dim * mlp_ratio` for the hidden width.
pub struct FeedForward {
    fc1: Linear,
    fc2: Linear,
    drop: Dropout,
}

impl FeedForward {
    pub fn new(
        in_features: usize,
        hidden_features: Option<usize>,
        out_features: Option<usize>,
        p: f32,
        rng: &mut StdRng,
    ) -> Result<Self, VitError> {
        let hidden = hidden_features.unwrap_or(in_features);
        let out = out_features.unwrap_or(in_features);
        log::debug!(
            "Initializing FeedForward with in={}, hidden={}, out={}",
            in_features,
            hidden,
            out
        );
        Ok(Self {
            fc1: Linear::new(in_features, hidden, rng),
            fc2: Linear::new(hidden, out, rng),
            drop: Dropout::new(p, rng.gen())?,
        })
    }

    pub fn forward_t(&self, input: &Tensor, training: bool) -> Result<Tensor, VitError> {
        let x = self.fc1.forward(input)?.gelu();
        let x = self.drop.forward_t(&x, training);
        let x = self.fc2.forward(&x)?;
        Ok(self.drop.forward_t(&x, training))
    }
}

impl Module for FeedForward {
    fn forward(&self, input: &Tensor) -> Result<Tensor, VitError> {
        self.forward_t(input, false)
    }

    fn parameters(&self) -> Vec<Tensor> {
        let mut params = self.fc1.parameters();
        params.extend(self.fc2.parameters());
        params
    }
}
