/// Inverse time decay of the learning rate, `lr_t = lr_0 / (1 + decay * t)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseTimeDecay {
    initial: f32,
    decay: f32,
}

impl InverseTimeDecay {
    /// Creates a new `InverseTimeDecay`.
    ///
    /// # Arguments
    /// * `initial` - The learning rate at `t = 0`.
    /// * `decay` - How fast the rate decays, zero keeps it constant.
    pub fn new(initial: f32, decay: f32) -> Self {
        Self { initial, decay }
    }

    pub fn initial(&self) -> f32 {
        self.initial
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// The learning rate after `t` ticks.
    pub fn at(&self, t: usize) -> f32 {
        self.initial / (1. + self.decay * t as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_the_initial_rate() {
        let schedule = InverseTimeDecay::new(0.01, 0.01 / 25.);
        assert_eq!(schedule.at(0), 0.01);
    }

    #[test]
    fn decays_inversely_with_time() {
        let schedule = InverseTimeDecay::new(0.01, 0.01 / 25.);

        for t in [1, 10, 24] {
            let expected = 0.01 / (1. + 0.0004 * t as f32);
            assert!((schedule.at(t) - expected).abs() < 1e-7);
        }

        assert!(schedule.at(24) < schedule.at(1));
    }

    #[test]
    fn no_decay_is_constant() {
        let schedule = InverseTimeDecay::new(0.1, 0.);
        assert_eq!(schedule.at(1000), 0.1);
    }
}
