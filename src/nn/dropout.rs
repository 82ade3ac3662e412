//! Inverted dropout.

use crate::error::VitError;
use crate::tensor::Tensor;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;

/// Randomly zeroes activations during training and rescales the survivors by
/// `1 / (1 - p)` so the expected activation is unchanged. At inference the
/// input passes through untouched and the RNG is never consulted, which keeps
/// inference a pure function of input and parameters.
pub struct Dropout {
    p: f32,
    rng: RefCell<StdRng>,
}

impl Dropout {
    /// Creates a dropout layer with drop probability `p`, seeded so that a
    /// training run can be replayed.
    pub fn new(p: f32, seed: u64) -> Result<Self, VitError> {
        if !(0.0..1.0).contains(&p) {
            return Err(VitError::InvalidDropout { p });
        }
        Ok(Self {
            p,
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        })
    }

    pub fn p(&self) -> f32 {
        self.p
    }

    /// Applies dropout in training mode, identity otherwise.
    pub fn forward_t(&self, input: &Tensor, training: bool) -> Tensor {
        if !training || self.p == 0.0 {
            return input.clone();
        }
        let keep = 1.0 - self.p;
        let scale = 1.0 / keep;
        let dist = Uniform::new(0.0f32, 1.0);
        let mut rng = self.rng.borrow_mut();
        let mask = input
            .data()
            .mapv(|_| if dist.sample(&mut *rng) < keep { scale } else { 0.0 });
        Tensor::from_data(&*input.data() * &mask)
    }
}
