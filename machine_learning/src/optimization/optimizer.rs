use crate::Result;

/// An optimization algorithm, updates the parameters of a model given its gradient.
pub trait Optimizer {
    /// Updates the parameters according to the algorithm's learning rule.
    ///
    /// # Arguments
    /// * `grad` - The gradient of the loss with respect to `params`.
    /// * `params` - The parameters that are going to be modified.
    ///
    /// # Returns
    /// An error if the gradient and parameters differ in size.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;

    /// Notifies the optimizer that a new epoch starts, `epoch` counting from zero.
    fn start_epoch(&mut self, _epoch: usize) {}

    /// The learning rate the next update will use.
    fn learning_rate(&self) -> f32;
}
