use ndarray::{Array2, ArrayView2};

/// A loss over a batch of predictions, one sample per row.
pub trait LossFn {
    /// The mean loss of the batch.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32;

    /// The derivative of `loss` with respect to every entry of `y_pred`.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;
}
