/// A logistic curve scaled to the `(0, amp)` range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sigmoid {
    amp: f32,
}

impl Sigmoid {
    pub fn new(amp: f32) -> Self {
        Self { amp }
    }

    pub fn f(&self, z: f32) -> f32 {
        self.amp / (1. + (-z).exp())
    }

    pub fn df(&self, z: f32) -> f32 {
        let s = 1. / (1. + (-z).exp());
        self.amp * s * (1. - s)
    }
}

impl Default for Sigmoid {
    fn default() -> Self {
        Self::new(1.)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_at_half_amplitude() {
        let sigmoid = Sigmoid::new(2.);
        assert_eq!(sigmoid.f(0.), 1.);
        assert!((sigmoid.df(0.) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn saturates() {
        let sigmoid = Sigmoid::default();
        assert!(sigmoid.f(20.) > 0.999);
        assert!(sigmoid.f(-20.) < 0.001);
        assert!(sigmoid.df(20.) < 1e-6);
    }
}
