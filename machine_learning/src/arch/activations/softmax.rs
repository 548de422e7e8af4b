use ndarray::{ArrayView1, ArrayViewMut1};

/// Normalized exponential, applied over the feature axis of each sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Softmax;

impl Softmax {
    /// Overwrites `lane` with its softmax. The maximum is subtracted first so large logits don't
    /// overflow.
    pub fn f(&self, mut lane: ArrayViewMut1<f32>) {
        let max = lane.fold(f32::NEG_INFINITY, |m, &z| m.max(z));
        lane.mapv_inplace(|z| (z - max).exp());

        let sum = lane.sum();
        lane.mapv_inplace(|e| e / sum);
    }

    /// Multiplies `d` by the softmax jacobian evaluated at output `a`, that is,
    /// `d_i <- a_i * (d_i - sum_j d_j * a_j)`.
    pub fn backward(&self, a: ArrayView1<f32>, mut d: ArrayViewMut1<f32>) {
        let dot = a.dot(&d);
        d.zip_mut_with(&a, |d, &a| *d = a * (*d - dot));
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array1, array};

    use super::*;

    #[test]
    fn is_a_distribution() {
        let mut z = array![1000., 1001., 999., -50.];
        Softmax.f(z.view_mut());

        assert!(z.iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert!((z.sum() - 1.).abs() < 1e-5);
        assert!(z[1] > z[0] && z[0] > z[2]);
    }

    #[test]
    fn uniform_logits_give_uniform_probabilities() {
        let mut z = Array1::from_elem(4, 3.);
        Softmax.f(z.view_mut());
        assert!(z.iter().all(|&p| (p - 0.25).abs() < 1e-6));
    }

    #[test]
    fn backward_of_cross_entropy_prime_is_difference() {
        let mut a = array![0.5, -1., 2.];
        Softmax.f(a.view_mut());

        let y = array![0., 0., 1.];
        let mut d = -&y / &a;
        Softmax.backward(a.view(), d.view_mut());

        for ((d, a), y) in d.iter().zip(&a).zip(&y) {
            assert!((d - (a - y)).abs() < 1e-5);
        }
    }
}
