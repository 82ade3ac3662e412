//! A basic linear layer.

use crate::error::VitError;
use crate::nn::Module;
use crate::tensor::Tensor;
use rand::rngs::StdRng;

pub struct Linear {
    weights: Tensor,
    bias: Option<Tensor>,
}

impl Linear {
    /// Creates a linear layer with a bias term.
    pub fn new(in_features: usize, out_features: usize, rng: &mut StdRng) -> Self {
        log::debug!(
            "Initializing Linear layer with in_features={}, out_features={}",
            in_features,
            out_features
        );
        Self {
            weights: Tensor::uniform(vec![in_features, out_features], -0.02, 0.02, rng),
            bias: Some(Tensor::zeros(vec![out_features])),
        }
    }

    /// Creates a linear layer without a bias term. Used for the Q/K/V
    /// projection when `qkv_bias` is disabled.
    pub fn without_bias(in_features: usize, out_features: usize, rng: &mut StdRng) -> Self {
        log::debug!(
            "Initializing bias-free Linear layer with in_features={}, out_features={}",
            in_features,
            out_features
        );
        Self {
            weights: Tensor::uniform(vec![in_features, out_features], -0.02, 0.02, rng),
            bias: None,
        }
    }

    pub fn in_features(&self) -> usize {
        self.weights.shape()[0]
    }

    pub fn out_features(&self) -> usize {
        self.weights.shape()[1]
    }
}

impl Module for Linear {
    fn forward(&self, input: &Tensor) -> Result<Tensor, VitError> {
        let x = input.matmul(&self.weights);
        Ok(match &self.bias {
            Some(bias) => &x + bias,
            None => x,
        })
    }

    fn parameters(&self) -> Vec<Tensor> {
        match &self.bias {
            Some(bias) => vec![self.weights.clone(), bias.clone()],
            None => vec![self.weights.clone()],
        }
    }
}
