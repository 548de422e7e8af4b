use log::debug;
use rand::{SeedableRng, rngs::StdRng};

use super::{ModelTrainer, Trainer};
use crate::{
    MlErr, Result,
    arch::{
        Model, Sequential,
        loss::{CategoricalCrossEntropy, LossFn, Mse},
    },
    optimization::{InverseTimeDecay, Optimizer, Sgd},
    specs::{LossFnSpec, ModelSpec, OptimizerSpec, TrainerSpec, ValidationSpec},
};

/// Builds `Trainer`s given a specification.
#[derive(Default)]
pub struct TrainerBuilder;

impl TrainerBuilder {
    /// Creates a new `TrainerBuilder`.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `Trainer` following a spec.
    ///
    /// # Arguments
    /// * `spec` - The specification for the trainer.
    ///
    /// # Returns
    /// The trainer, with its model freshly initialized, or an error if the spec is inconsistent.
    pub fn build(&self, spec: &TrainerSpec) -> Result<Box<dyn Trainer>> {
        self.validate(spec)?;

        let rng = self.generate_rng(spec.training.seed);
        self.resolve_model(spec, rng)
    }

    fn validate(&self, spec: &TrainerSpec) -> Result<()> {
        match spec.training.validation {
            ValidationSpec::Holdout { fraction }
                if fraction.is_nan() || fraction <= 0. || fraction >= 1. =>
            {
                Err(MlErr::InvalidSpec(format!(
                    "the holdout fraction must lie in (0, 1), got {fraction}"
                )))
            }
            _ => Ok(()),
        }
    }

    fn resolve_model(&self, spec: &TrainerSpec, mut rng: StdRng) -> Result<Box<dyn Trainer>> {
        match &spec.model {
            ModelSpec::Sequential { input, layers } => {
                let model = Sequential::build(input.clone(), layers, &mut rng)?;
                debug!("resolved a model of {} parameters", model.size());
                self.resolve_optimizer(spec, model, rng)
            }
        }
    }

    fn resolve_optimizer<M>(
        &self,
        spec: &TrainerSpec,
        model: M,
        rng: StdRng,
    ) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
    {
        match spec.training.optimizer {
            OptimizerSpec::Sgd {
                learning_rate,
                momentum,
                nesterov,
                decay,
                decay_interval,
            } => {
                if learning_rate.is_nan() || learning_rate <= 0. {
                    return Err(MlErr::InvalidSpec(format!(
                        "the learning rate must be positive, got {learning_rate}"
                    )));
                }

                if !(0. ..1.).contains(&momentum) {
                    return Err(MlErr::InvalidSpec(format!(
                        "the momentum must lie in [0, 1), got {momentum}"
                    )));
                }

                let decay = decay.unwrap_or(learning_rate / spec.training.epochs.get() as f32);

                if decay.is_nan() || decay < 0. {
                    return Err(MlErr::InvalidSpec(format!(
                        "the learning rate decay can't be negative, got {decay}"
                    )));
                }

                let schedule = InverseTimeDecay::new(learning_rate, decay);
                let optimizer = Sgd::new(schedule, decay_interval, momentum, nesterov);
                self.resolve_loss(spec, model, optimizer, rng)
            }
        }
    }

    fn resolve_loss<M, O>(
        &self,
        spec: &TrainerSpec,
        model: M,
        optimizer: O,
        rng: StdRng,
    ) -> Result<Box<dyn Trainer>>
    where
        M: Model + 'static,
        O: Optimizer + 'static,
    {
        match spec.training.loss {
            LossFnSpec::CategoricalCrossEntropy => {
                let loss_fn = CategoricalCrossEntropy::new();
                Ok(self.terminate_build(spec, model, optimizer, loss_fn, rng))
            }
            LossFnSpec::Mse => {
                let loss_fn = Mse::new();
                Ok(self.terminate_build(spec, model, optimizer, loss_fn, rng))
            }
        }
    }

    fn terminate_build<M, O, L>(
        &self,
        spec: &TrainerSpec,
        model: M,
        optimizer: O,
        loss_fn: L,
        rng: StdRng,
    ) -> Box<dyn Trainer>
    where
        M: Model + 'static,
        O: Optimizer + 'static,
        L: LossFn + 'static,
    {
        let training = &spec.training;

        let trainer = ModelTrainer::new(
            model,
            optimizer,
            loss_fn,
            training.epochs,
            training.batch_size,
            training.shuffle,
            training.validation,
            rng,
        );

        Box::new(trainer)
    }

    fn generate_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
