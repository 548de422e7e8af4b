use ndarray::ArrayD;
use rand::RngCore;
use rand_distr::{Bernoulli, Distribution};

use crate::{MlErr, Result};

/// Inverted dropout.
///
/// While training, zeroes each input unit with probability `rate` and scales the survivors by
/// `1 / (1 - rate)` so the expected activation is the same as in evaluation, where the layer is
/// the identity.
#[derive(Debug, Clone)]
pub struct Dropout {
    rate: f32,
    keep: Bernoulli,

    // Forward metadata, `None` after an evaluation pass
    mask: Option<ArrayD<f32>>,
}

impl Dropout {
    /// Creates a new `Dropout`.
    ///
    /// # Arguments
    /// * `rate` - The probability of dropping each unit, in `[0, 1)`.
    pub fn new(rate: f32) -> Result<Self> {
        if !(0. ..1.).contains(&rate) {
            return Err(MlErr::InvalidSpec(format!(
                "dropout rate must be in [0, 1), got {rate}"
            )));
        }

        Ok(Self {
            rate,
            keep: Bernoulli::new(1. - rate as f64)?,
            mask: None,
        })
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Makes a forward pass, dropping units only when a random number generator is given.
    pub fn forward(
        &mut self,
        x: ArrayD<f32>,
        rng: Option<&mut (dyn RngCore + '_)>,
    ) -> ArrayD<f32> {
        let Some(rng) = rng.filter(|_| self.rate > 0.) else {
            self.mask = None;
            return x;
        };

        let scale = 1. / (1. - self.rate);
        let mask = ArrayD::from_shape_simple_fn(x.raw_dim(), || {
            if self.keep.sample(&mut *rng) { scale } else { 0. }
        });

        let out = x * &mask;
        self.mask = Some(mask);
        out
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> ArrayD<f32> {
        match &self.mask {
            Some(mask) => d * mask,
            None => d,
        }
    }
}
