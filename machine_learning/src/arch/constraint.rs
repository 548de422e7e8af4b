use ndarray::{ArrayViewMut2, Axis};

/// Guards against a zero norm when rescaling.
const EPSILON: f32 = 1e-7;

/// Caps the euclidean norm of the weights feeding each output unit.
///
/// Applied to a layer's weights right after every optimizer update, lanes whose norm exceeds
/// `max_value` are scaled back onto the ball, the rest are left as they are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxNorm {
    max_value: f32,
}

impl MaxNorm {
    /// Creates a new `MaxNorm`.
    ///
    /// # Arguments
    /// * `max_value` - The maximum norm allowed for each unit's incoming weights.
    pub fn new(max_value: f32) -> Self {
        Self { max_value }
    }

    pub fn max_value(&self) -> f32 {
        self.max_value
    }

    /// Rescales every lane of `w` along `axis` whose norm exceeds the bound.
    ///
    /// # Arguments
    /// * `w` - The weights.
    /// * `axis` - The axis the incoming weights of a single unit are laid along.
    pub fn apply(&self, mut w: ArrayViewMut2<f32>, axis: Axis) {
        for mut lane in w.lanes_mut(axis) {
            let norm = lane.dot(&lane).sqrt();
            if norm > self.max_value {
                let scale = self.max_value / (norm + EPSILON);
                lane.mapv_inplace(|w| w * scale);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, array};

    use super::*;

    fn lane_norms(w: &Array2<f32>, axis: Axis) -> Vec<f32> {
        w.lanes(axis).into_iter().map(|l| l.dot(&l).sqrt()).collect()
    }

    #[test]
    fn caps_columns() {
        // columns have norms 5 and 1
        let mut w = array![[3., 1.], [4., 0.]];
        MaxNorm::new(3.).apply(w.view_mut(), Axis(0));

        let norms = lane_norms(&w, Axis(0));
        assert!((norms[0] - 3.).abs() < 1e-4);
        assert_eq!(norms[1], 1.);
        assert_eq!(w.column(1), array![1., 0.]);
    }

    #[test]
    fn caps_rows() {
        let mut w = array![[30., 40.], [0.1, 0.2]];
        MaxNorm::new(2.).apply(w.view_mut(), Axis(1));

        let norms = lane_norms(&w, Axis(1));
        assert!(norms.iter().all(|&n| n <= 2. + 1e-4));
        assert!((w[[0, 0]] / w[[0, 1]] - 0.75).abs() < 1e-5);
    }
}
