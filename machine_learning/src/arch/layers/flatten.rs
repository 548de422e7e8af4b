use ndarray::{ArrayD, IxDyn};

use super::standard;
use crate::Result;

/// Collapses every axis but the batch one, `(n, c, h, w) -> (n, c * h * w)`, in row major order.
#[derive(Debug, Clone, Default)]
pub struct Flatten {
    // Forward metadata
    shape: Vec<usize>,
}

impl Flatten {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        self.shape = x.shape().to_vec();
        let n = self.shape.first().copied().unwrap_or(0);
        let features = self.shape.iter().skip(1).product::<usize>();

        Ok(standard(x).into_shape_with_order(IxDyn(&[n, features]))?)
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        Ok(standard(d).into_shape_with_order(IxDyn(&self.shape))?)
    }
}
