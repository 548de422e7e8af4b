use ndarray::{Array2, ArrayView2, Axis, Zip};

use super::LossFn;

/// Probabilities are clipped to `[EPSILON, 1 - EPSILON]` before taking logarithms.
const EPSILON: f32 = 1e-7;

/// Categorical cross-entropy between a predicted distribution and a one-hot target, averaged
/// over the batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct CategoricalCrossEntropy;

impl CategoricalCrossEntropy {
    /// Returns a new `CategoricalCrossEntropy`.
    pub fn new() -> Self {
        Self
    }
}

fn clip(p: f32) -> f32 {
    p.clamp(EPSILON, 1. - EPSILON)
}

impl LossFn for CategoricalCrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let n = y_pred.len_of(Axis(0));
        if n == 0 {
            return 0.;
        }

        let mut total = 0.;
        Zip::from(&y_pred).and(&y).for_each(|&p, &y| {
            if y != 0. {
                total -= y * clip(p).ln();
            }
        });

        total / n as f32
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.len_of(Axis(0)).max(1) as f32;
        Zip::from(&y_pred)
            .and(&y)
            .map_collect(|&p, &y| -y / (clip(p) * n))
    }
}
