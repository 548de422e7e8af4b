use super::History;
use crate::{Result, arch::Summary, dataset::Dataset, evaluation::Evaluation};

/// The public interface of a training run, hiding the concrete model, optimizer and loss.
pub trait Trainer {
    /// Trains the model for the configured amount of epochs.
    ///
    /// # Arguments
    /// * `train` - The training split.
    /// * `test` - The test split, monitored after every epoch only if the validation policy says so.
    ///
    /// # Returns
    /// The metrics of every epoch or an error if occurred.
    fn fit(&mut self, train: Dataset, test: &Dataset) -> Result<History>;

    /// Evaluates the model over `dataset` without modifying it.
    fn evaluate(&mut self, dataset: &Dataset) -> Result<Evaluation>;

    fn summary(&self) -> Summary;
}
