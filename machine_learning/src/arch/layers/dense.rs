use ndarray::{ArrayD, Ix2, linalg, prelude::*};
use rand::RngCore;

use crate::{
    MlErr, Result,
    arch::{activations::ActFn, constraint::MaxNorm},
    initialization::Initializer,
};

/// A fully connected layer.
///
/// Parameters are laid out as the `(inputs, units)` weight matrix followed by one bias per unit.
///
/// Optimizations:
///   1. Find a way to not copy `x` in each `Dense::forward` call.
#[derive(Debug, Clone)]
pub struct Dense {
    dim: (usize, usize),
    act_fn: Option<ActFn>,
    max_norm: Option<MaxNorm>,
    init: Initializer,
    size: usize,

    // Forward metadata
    x: Array2<f32>,
    z: Array2<f32>,
    a: Array2<f32>,
}

impl Dense {
    /// Creates a new `Dense`.
    ///
    /// # Arguments
    /// * `dim` - The amount of inputs and outputs (units) of the layer.
    /// * `act_fn` - An optional activation function.
    /// * `max_norm` - An optional bound for the norm of each unit's incoming weights.
    /// * `init` - The weight initializer, biases always start at zero.
    pub fn new(
        dim: (usize, usize),
        act_fn: Option<ActFn>,
        max_norm: Option<MaxNorm>,
        init: Initializer,
    ) -> Self {
        let zeros = Array2::zeros((1, 1));

        Self {
            dim,
            size: (dim.0 + 1) * dim.1,
            act_fn,
            max_norm,
            init,
            x: zeros.clone(),
            z: zeros.clone(),
            a: zeros,
        }
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn units(&self) -> usize {
        self.dim.1
    }

    pub fn act_fn(&self) -> Option<ActFn> {
        self.act_fn
    }

    pub fn max_norm(&self) -> Option<MaxNorm> {
        self.max_norm
    }

    /// Writes the initial value of this layer's parameters.
    pub fn init(&self, rng: &mut dyn RngCore, params: &mut [f32]) {
        let (w, b) = params.split_at_mut(self.size - self.dim.1);
        self.init.fill(rng, w);
        Initializer::zeros().fill(rng, b);
    }

    /// Makes a forward pass through this layer.
    ///
    /// # Arguments
    /// * `params` - This layer's parameters.
    /// * `x` - A `(batch, inputs)` input.
    ///
    /// # Returns
    /// The `(batch, units)` output or an error if `x` is not two dimensional.
    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix2>()?;
        if x.ncols() != self.dim.0 {
            return Err(MlErr::SizeMismatch {
                what: "dense input",
                got: x.ncols(),
                expected: self.dim.0,
            });
        }

        let (w, b) = self.view_params(params)?;
        let shape = (x.nrows(), self.dim.1);

        if self.z.dim() != shape {
            self.z = Array2::zeros(shape);
        }
        linalg::general_mat_mul(1.0, &x, &w, 0.0, &mut self.z);
        self.z += &b;

        self.x = x;

        let Some(act_fn) = self.act_fn else {
            return Ok(self.z.clone().into_dyn());
        };

        act_fn.forward(&self.z, &mut self.a);
        Ok(self.a.clone().into_dyn())
    }

    /// Makes a backward pass through this layer, writing its gradient.
    ///
    /// # Arguments
    /// * `params` - This layer's parameters.
    /// * `grad` - This layer's slice of the gradient.
    /// * `d` - The delta with respect to this layer's output.
    ///
    /// # Returns
    /// The delta with respect to this layer's input.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        let mut d = d.into_dimensionality::<Ix2>()?;
        if let Some(act_fn) = &self.act_fn {
            act_fn.backward(&self.z, &self.a, &mut d);
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        linalg::general_mat_mul(1.0, &self.x.t(), &d, 0.0, &mut dw);
        db.assign(&d.sum_axis(Axis(0)));

        let (w, _) = self.view_params(params)?;
        let mut dx = Array2::zeros((d.nrows(), w.nrows()));
        linalg::general_mat_mul(1.0, &d, &w.t(), 0.0, &mut dx);

        Ok(dx.into_dyn())
    }

    /// Rescales the incoming weights of each unit whose norm exceeds this layer's bound, if any.
    pub fn constrain(&self, params: &mut [f32]) -> Result<()> {
        let Some(max_norm) = self.max_norm else {
            return Ok(());
        };

        let w_size = self.size - self.dim.1;
        let w = ArrayViewMut2::from_shape(self.dim, &mut params[..w_size])?;
        max_norm.apply(w, Axis(0));
        Ok(())
    }

    /// Gives a view of the raw gradient slice as the delta weights and delta biases of this layer.
    ///
    /// # Arguments
    /// * `grad` - A gradient slice.
    ///
    /// # Returns
    /// A tuple containing the delta weights and delta biases.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        let w_size = self.size - self.dim.1;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape(self.dim, dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.dim.1, db_raw)?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    ///
    /// # Arguments
    /// * `params` - A slice of parameters.
    ///
    /// # Returns
    /// A tuple containing the weights and biases.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let w_size = self.size - self.dim.1;
        let weights = ArrayView2::from_shape(self.dim, &params[..w_size])?;
        let biases = ArrayView1::from_shape(self.dim.1, &params[w_size..])?;
        Ok((weights, biases))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn dense(dim: (usize, usize), act_fn: Option<ActFn>) -> Dense {
        Dense::new(dim, act_fn, None, Initializer::zeros())
    }

    #[test]
    fn size_counts_weights_and_biases() {
        assert_eq!(dense((4096, 512), None).size(), 4096 * 512 + 512);
    }

    #[test]
    fn forward_is_affine() {
        let mut layer = dense((2, 3), None);
        // w = [[1, 2, 3], [4, 5, 6]], b = [0.5, 0, -1]
        let params = [1., 2., 3., 4., 5., 6., 0.5, 0., -1.];
        let x = array![[1., 1.], [2., 0.]].into_dyn();

        let y = layer.forward(&params, x).unwrap();

        assert_eq!(y, array![[5.5, 7., 8.], [2.5, 4., 5.]].into_dyn());
    }

    #[test]
    fn backward_writes_gradient() {
        let mut layer = dense((2, 1), None);
        let params = [2., -1., 0.];
        let mut grad = [0.; 3];

        layer
            .forward(&params, array![[1., 3.]].into_dyn())
            .unwrap();
        let dx = layer
            .backward(&params, &mut grad, array![[2.]].into_dyn())
            .unwrap();

        assert_eq!(grad, [2., 6., 2.]);
        assert_eq!(dx, array![[4., -2.]].into_dyn());
    }

    #[test]
    fn rejects_wrong_width() {
        let mut layer = dense((3, 2), Some(ActFn::relu()));
        let params = vec![0.; layer.size()];

        assert!(layer.forward(&params, array![[1., 2.]].into_dyn()).is_err());
    }

    #[test]
    fn max_norm_caps_unit_columns() {
        let layer = Dense::new((2, 2), None, Some(MaxNorm::new(1.)), Initializer::zeros());
        // columns (3, 4) and (0.1, 0.2), biases untouched
        let mut params = [3., 0.1, 4., 0.2, 9., 9.];

        layer.constrain(&mut params).unwrap();

        let norm = (params[0] * params[0] + params[2] * params[2]).sqrt();
        assert!((norm - 1.).abs() < 1e-4);
        assert_eq!([params[1], params[3], params[4], params[5]], [0.1, 0.2, 9., 9.]);
    }
}
