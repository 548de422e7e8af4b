use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use crate::{Result, specs::InitSpec};

/// Generates the initial values of a layer's parameters.
#[derive(Debug, Clone)]
pub enum Initializer {
    Const(f32),
    Uniform(Uniform<f32>),
    Normal(Normal<f32>),
}

impl Initializer {
    /// Resolves a spec given the fan of the weight tensor being initialized.
    ///
    /// # Arguments
    /// * `spec` - The initialization spec.
    /// * `fan_in` - The number of input units in the weight tensor.
    /// * `fan_out` - The number of output units in the weight tensor.
    ///
    /// # Returns
    /// An error if the resulting distribution parameters are invalid.
    pub fn from_spec(spec: InitSpec, fan_in: usize, fan_out: usize) -> Result<Self> {
        match spec {
            InitSpec::GlorotUniform => Self::glorot_uniform(fan_in, fan_out),
            InitSpec::GlorotNormal => Self::glorot_normal(fan_in, fan_out),
            InitSpec::HeNormal => Self::he_normal(fan_in),
            InitSpec::LecunUniform => Self::lecun_uniform(fan_in),
            InitSpec::LecunNormal => Self::lecun_normal(fan_in),
            InitSpec::Uniform { low, high } => Self::uniform(low, high),
            InitSpec::Normal { mean, std_dev } => Self::normal(mean, std_dev),
            InitSpec::Const { value } => Ok(Self::Const(value)),
        }
    }

    pub fn zeros() -> Self {
        Self::Const(0.)
    }

    /// A uniform distribution over `[low, high)`.
    ///
    /// # Returns
    /// An error if the range is invalid (low >= high).
    pub fn uniform(low: f32, high: f32) -> Result<Self> {
        Ok(Self::Uniform(Uniform::new(low, high)?))
    }

    /// A normal distribution.
    ///
    /// # Returns
    /// An error if `std_dev` is not finite (Nan or infinite).
    pub fn normal(mean: f32, std_dev: f32) -> Result<Self> {
        Ok(Self::Normal(Normal::new(mean, std_dev)?))
    }

    /// Xavier/Glorot uniform initialization, `U(-l, l)` with `l = sqrt(6 / (fan_in + fan_out))`.
    pub fn glorot_uniform(fan_in: usize, fan_out: usize) -> Result<Self> {
        let range = (6. / (fan_in + fan_out) as f32).sqrt();
        Self::uniform(-range, range)
    }

    /// Xavier/Glorot normal initialization, `N(0, sqrt(2 / (fan_in + fan_out)))`.
    pub fn glorot_normal(fan_in: usize, fan_out: usize) -> Result<Self> {
        Self::he_normal(fan_in + fan_out)
    }

    /// Kaiming/He normal initialization, `N(0, sqrt(2 / fan_in))`.
    pub fn he_normal(fan_in: usize) -> Result<Self> {
        let std_dev = (2. / fan_in as f32).sqrt();
        Self::normal(0., std_dev)
    }

    /// LeCun uniform initialization, `U(-l, l)` with `l = sqrt(3 / fan_in)`.
    pub fn lecun_uniform(fan_in: usize) -> Result<Self> {
        let range = (3. / fan_in as f32).sqrt();
        Self::uniform(-range, range)
    }

    /// LeCun normal initialization, `N(0, sqrt(1 / fan_in))`.
    pub fn lecun_normal(fan_in: usize) -> Result<Self> {
        let std_dev = (1. / fan_in as f32).sqrt();
        Self::normal(0., std_dev)
    }

    /// Overwrites every value of `params` with a fresh sample.
    pub fn fill<R: Rng + ?Sized>(&self, rng: &mut R, params: &mut [f32]) {
        match self {
            Self::Const(value) => params.fill(*value),
            Self::Uniform(dist) => params.iter_mut().for_each(|p| *p = dist.sample(rng)),
            Self::Normal(dist) => params.iter_mut().for_each(|p| *p = dist.sample(rng)),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn glorot_uniform_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut params = vec![0.; 1000];

        Initializer::glorot_uniform(27, 288)
            .unwrap()
            .fill(&mut rng, &mut params);

        let limit = (6f32 / 315.).sqrt();
        assert!(params.iter().all(|p| p.abs() <= limit));
        assert!(params.iter().any(|&p| p != 0.));
    }

    #[test]
    fn same_seed_same_values() {
        let init = Initializer::he_normal(10).unwrap();

        let mut a = vec![0.; 16];
        let mut b = vec![0.; 16];
        init.fill(&mut StdRng::seed_from_u64(7), &mut a);
        init.fill(&mut StdRng::seed_from_u64(7), &mut b);

        assert_eq!(a, b);
    }

    #[test]
    fn invalid_range_is_an_error() {
        assert!(Initializer::uniform(1., -1.).is_err());
        assert!(Initializer::normal(0., f32::NAN).is_err());
    }

    #[test]
    fn constant() {
        let mut params = vec![1.; 4];
        Initializer::zeros().fill(&mut StdRng::seed_from_u64(0), &mut params);
        assert_eq!(params, [0.; 4]);
    }
}
