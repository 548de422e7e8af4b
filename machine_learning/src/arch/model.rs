use ndarray::{Array2, ArrayD};
use rand::RngCore;

use super::{Summary, loss::LossFn};
use crate::{Result, evaluation::Evaluation, optimization::Optimizer};

pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Predicts the output for a batch of inputs in evaluation mode: dropout is disabled and
    /// the parameters are left untouched.
    ///
    /// # Arguments
    /// * `x` - The batch of inputs, batch axis first.
    ///
    /// # Returns
    /// One output row per input sample.
    fn predict(&mut self, x: ArrayD<f32>) -> Result<Array2<f32>>;

    /// Computes the gradient of the loss function with respect to the parameters of the model over
    /// the provided batches. **The parameters get updated** for each batch according to the
    /// optimization algorithm.
    ///
    /// # Arguments
    /// * `optimizer` - The optimizer that dictates how to update the weights on each gradient calculation.
    /// * `loss_fn` - The loss function.
    /// * `batches` - The batches of data.
    /// * `rng` - The randomness source of the stochastic layers.
    ///
    /// # Returns
    /// The loss and accuracy over the batches, measured while training.
    fn backprop<O, L, I>(
        &mut self,
        optimizer: &mut O,
        loss_fn: &L,
        batches: I,
        rng: &mut dyn RngCore,
    ) -> Result<Evaluation>
    where
        O: Optimizer,
        L: LossFn,
        I: Iterator<Item = (ArrayD<f32>, Array2<f32>)>;

    /// A layer by layer description of the model.
    fn summary(&self) -> Summary;
}
