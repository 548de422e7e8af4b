use super::{InverseTimeDecay, Optimizer};
use crate::{MlErr, Result, specs::DecayInterval};

/// Stochastic gradient descent with momentum, optional Nesterov acceleration and an inverse time
/// decaying learning rate.
///
/// With learning rate `lr`, momentum `mu` and velocity `v` (starting at zero), each update does
/// `v <- mu * v - lr * g` followed by `p <- p + v`, or `p <- p + mu * v - lr * g` when Nesterov
/// is enabled.
#[derive(Debug, Clone)]
pub struct Sgd {
    schedule: InverseTimeDecay,
    interval: DecayInterval,
    momentum: f32,
    nesterov: bool,

    learning_rate: f32,
    iterations: usize,
    velocity: Vec<f32>,
}

impl Sgd {
    /// Returns a new `Sgd`.
    ///
    /// # Arguments
    /// * `schedule` - The learning rate schedule.
    /// * `interval` - Whether the schedule ticks once per epoch or once per update.
    /// * `momentum` - The momentum factor, zero for plain gradient descent.
    /// * `nesterov` - Whether to apply Nesterov momentum.
    pub fn new(
        schedule: InverseTimeDecay,
        interval: DecayInterval,
        momentum: f32,
        nesterov: bool,
    ) -> Self {
        Self {
            learning_rate: schedule.at(0),
            schedule,
            interval,
            momentum,
            nesterov,
            iterations: 0,
            velocity: Vec::new(),
        }
    }

    /// Plain gradient descent with a constant learning rate.
    pub fn constant(learning_rate: f32) -> Self {
        Self::new(
            InverseTimeDecay::new(learning_rate, 0.),
            DecayInterval::Epoch,
            0.,
            false,
        )
    }

    /// The amount of updates applied so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

impl Optimizer for Sgd {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        if grad.len() != params.len() {
            return Err(MlErr::SizeMismatch {
                what: "gradient",
                got: grad.len(),
                expected: params.len(),
            });
        }

        if self.velocity.len() != params.len() {
            self.velocity = vec![0.; params.len()];
        }

        if self.interval == DecayInterval::Step {
            self.learning_rate = self.schedule.at(self.iterations);
        }

        let (lr, mu) = (self.learning_rate, self.momentum);

        for ((p, &g), v) in params.iter_mut().zip(grad).zip(&mut self.velocity) {
            *v = mu * *v - lr * g;

            *p += if self.nesterov { mu * *v - lr * g } else { *v };
        }

        self.iterations += 1;
        Ok(())
    }

    fn start_epoch(&mut self, epoch: usize) {
        if self.interval == DecayInterval::Epoch {
            self.learning_rate = self.schedule.at(epoch);
        }
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_descent() {
        let mut sgd = Sgd::constant(0.5);
        let mut params = [1., -1.];

        sgd.update_params(&[2., -4.], &mut params).unwrap();

        assert_eq!(params, [0., 1.]);
    }

    #[test]
    fn momentum_accumulates_velocity() {
        let schedule = InverseTimeDecay::new(0.1, 0.);
        let mut sgd = Sgd::new(schedule, DecayInterval::Epoch, 0.9, false);
        let mut params = [0.];

        // v1 = -0.1, p1 = -0.1; v2 = 0.9 * -0.1 - 0.1 = -0.19, p2 = -0.29
        sgd.update_params(&[1.], &mut params).unwrap();
        sgd.update_params(&[1.], &mut params).unwrap();

        assert!((params[0] + 0.29).abs() < 1e-6);
    }

    #[test]
    fn nesterov_looks_ahead() {
        let schedule = InverseTimeDecay::new(0.1, 0.);
        let mut sgd = Sgd::new(schedule, DecayInterval::Epoch, 0.9, true);
        let mut params = [0.];

        // v1 = -0.1, p1 = 0.9 * -0.1 - 0.1 = -0.19
        sgd.update_params(&[1.], &mut params).unwrap();

        assert!((params[0] + 0.19).abs() < 1e-6);
    }

    #[test]
    fn epoch_decay_ticks_on_epochs() {
        let schedule = InverseTimeDecay::new(0.01, 0.5);
        let mut sgd = Sgd::new(schedule, DecayInterval::Epoch, 0.9, false);
        let mut params = [0.; 2];

        sgd.start_epoch(0);
        sgd.update_params(&[1., 1.], &mut params).unwrap();
        sgd.update_params(&[1., 1.], &mut params).unwrap();
        assert_eq!(sgd.learning_rate(), 0.01);

        sgd.start_epoch(2);
        assert!((sgd.learning_rate() - 0.005).abs() < 1e-9);
    }

    #[test]
    fn step_decay_ticks_on_updates() {
        let schedule = InverseTimeDecay::new(0.01, 1.);
        let mut sgd = Sgd::new(schedule, DecayInterval::Step, 0., false);
        let mut params = [0.];

        sgd.start_epoch(5);
        sgd.update_params(&[1.], &mut params).unwrap();
        assert_eq!(sgd.learning_rate(), 0.01);

        sgd.update_params(&[1.], &mut params).unwrap();
        assert_eq!(sgd.learning_rate(), 0.005);
        assert_eq!(sgd.iterations(), 2);
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let mut sgd = Sgd::constant(0.1);
        assert!(sgd.update_params(&[1.], &mut [0., 0.]).is_err());
    }
}
