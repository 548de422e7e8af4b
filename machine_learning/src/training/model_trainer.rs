use std::num::NonZeroUsize;

use log::{info, warn};
use rand::Rng;

use super::{EpochMetrics, History, Trainer};
use crate::{
    Result,
    arch::{Model, Summary, loss::LossFn},
    dataset::Dataset,
    evaluation::{self, Evaluation},
    optimization::Optimizer,
    specs::ValidationSpec,
};

/// A model `Trainer`. Contains the relevant components needed for training a model,
/// including the model itself.
pub struct ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    model: M,
    optimizer: O,
    loss_fn: L,

    epochs: NonZeroUsize,
    batch_size: NonZeroUsize,
    shuffle: bool,
    validation: ValidationSpec,
    rng: R,
}

impl<M, O, L, R> ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    /// Returns a new `ModelTrainer`.
    ///
    /// # Arguments
    /// * `model` - The model that will be trained.
    /// * `optimizer` - The optimizer applying every batch's gradient.
    /// * `loss_fn` - The loss function used to measure the difference between a model's output and the expected one.
    /// * `epochs` - The amount of passes over the training split.
    /// * `batch_size` - The amount of samples per update.
    /// * `shuffle` - Whether to reshuffle the training split before every epoch.
    /// * `validation` - Which data to evaluate after every epoch.
    /// * `rng` - The randomness source for shuffling and dropout.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        model: M,
        optimizer: O,
        loss_fn: L,
        epochs: NonZeroUsize,
        batch_size: NonZeroUsize,
        shuffle: bool,
        validation: ValidationSpec,
        rng: R,
    ) -> Self {
        Self {
            model,
            optimizer,
            loss_fn,
            epochs,
            batch_size,
            shuffle,
            validation,
            rng,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Runs a single epoch over `train`.
    ///
    /// # Returns
    /// The learning rate the epoch started with, and the loss and accuracy measured while training.
    fn train_epoch(&mut self, epoch: usize, train: &mut Dataset) -> Result<(f32, Evaluation)> {
        self.optimizer.start_epoch(epoch);
        let learning_rate = self.optimizer.learning_rate();

        if self.shuffle {
            train.shuffle(&mut self.rng);
        }

        let batches = train.batches(self.batch_size);
        let training = self
            .model
            .backprop(&mut self.optimizer, &self.loss_fn, batches, &mut self.rng)?;

        Ok((learning_rate, training))
    }
}

impl<M, O, L, R> Trainer for ModelTrainer<M, O, L, R>
where
    M: Model,
    O: Optimizer,
    L: LossFn,
    R: Rng,
{
    fn fit(&mut self, train: Dataset, test: &Dataset) -> Result<History> {
        let (mut train, holdout) = match self.validation {
            ValidationSpec::Holdout { fraction } => {
                let (train, holdout) = train.split_holdout(fraction)?;
                (train, Some(holdout))
            }
            _ => (train, None),
        };

        let monitored = match self.validation {
            ValidationSpec::TestSplit => {
                warn!("monitoring the test split, the reported test accuracy is not held out");
                Some(test)
            }
            ValidationSpec::Holdout { .. } => holdout.as_ref(),
            ValidationSpec::Disabled => None,
        };

        info!(
            "training on {} samples for {} epochs, {} per batch",
            train.len(),
            self.epochs,
            self.batch_size
        );

        let mut history = History::default();

        for epoch in 0..self.epochs.get() {
            let (learning_rate, training) = self.train_epoch(epoch, &mut train)?;

            if !training.loss.is_finite() {
                warn!("epoch {}: loss is {}", epoch + 1, training.loss);
            }

            let validation = monitored
                .map(|dataset| {
                    evaluation::evaluate(&mut self.model, &self.loss_fn, dataset, self.batch_size)
                })
                .transpose()?;

            match validation {
                Some(val) => info!(
                    "epoch {}/{}: lr {learning_rate:.6} - loss {:.4} - accuracy {:.4} - val_loss {:.4} - val_accuracy {:.4}",
                    epoch + 1,
                    self.epochs,
                    training.loss,
                    training.accuracy,
                    val.loss,
                    val.accuracy
                ),
                None => info!(
                    "epoch {}/{}: lr {learning_rate:.6} - loss {:.4} - accuracy {:.4}",
                    epoch + 1,
                    self.epochs,
                    training.loss,
                    training.accuracy
                ),
            }

            history.push(EpochMetrics {
                epoch,
                learning_rate,
                loss: training.loss,
                accuracy: training.accuracy,
                validation,
            });
        }

        Ok(history)
    }

    fn evaluate(&mut self, dataset: &Dataset) -> Result<Evaluation> {
        evaluation::evaluate(&mut self.model, &self.loss_fn, dataset, self.batch_size)
    }

    fn summary(&self) -> Summary {
        self.model.summary()
    }
}
