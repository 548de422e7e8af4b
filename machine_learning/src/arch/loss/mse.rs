use ndarray::{Array2, ArrayView2, Zip};

use super::LossFn;

/// Squared error averaged over every output of every sample in the batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mse;

impl Mse {
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for Mse {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        if y_pred.is_empty() {
            return 0.;
        }

        let total = Zip::from(&y_pred)
            .and(&y)
            .fold(0., |total, &p, &y| total + (p - y) * (p - y));

        total / y_pred.len() as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let scale = 2. / y_pred.len().max(1) as f32;
        Zip::from(&y_pred)
            .and(&y)
            .map_collect(|&p, &y| scale * (p - y))
    }
}
