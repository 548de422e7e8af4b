use ndarray::{
    Array3, Array4, ArrayD, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis, Ix4, Zip,
    linalg,
};
use rand::RngCore;

use super::{patches::Patches, standard};
use crate::{
    MlErr, Result,
    arch::{activations::ActFn, constraint::MaxNorm},
    initialization::Initializer,
    specs::Padding,
};

/// A 2D convolution over `(channels, height, width)` feature maps with square kernels and
/// stride 1.
///
/// Parameters are laid out as the `(filters, channels * kernel * kernel)` kernel matrix followed
/// by one bias per filter.
#[derive(Debug, Clone)]
pub struct Conv2d {
    patches: Patches,
    filters: usize,
    act_fn: Option<ActFn>,
    max_norm: Option<MaxNorm>,
    init: Initializer,
    size: usize,

    // Forward metadata
    cols: Array3<f32>,
    z: Array3<f32>,
    a: Array3<f32>,
}

impl Conv2d {
    /// Creates a new `Conv2d`.
    ///
    /// # Arguments
    /// * `input` - The `(channels, height, width)` shape of a single input sample.
    /// * `filters` - The amount of kernels, that is, of output channels.
    /// * `kernel` - The side of the square kernel.
    /// * `padding` - The padding mode.
    /// * `act_fn` - An optional activation function.
    /// * `max_norm` - An optional bound for the norm of each kernel.
    /// * `init` - The kernel initializer, biases always start at zero.
    ///
    /// # Returns
    /// An error if the kernel doesn't fit in the padded input.
    pub fn new(
        input: (usize, usize, usize),
        filters: usize,
        kernel: usize,
        padding: Padding,
        act_fn: Option<ActFn>,
        max_norm: Option<MaxNorm>,
        init: Initializer,
    ) -> Result<Self> {
        let (channels, height, width) = input;

        if kernel == 0 || filters == 0 {
            return Err(MlErr::InvalidSpec(
                "convolutions need at least one filter and a non empty kernel".into(),
            ));
        }

        // "same" pads `kernel - 1` in total, the extra one (even kernels) goes after the input
        let (pad, total) = match padding {
            Padding::Same => ((kernel - 1) / 2, kernel - 1),
            Padding::Valid => (0, 0),
        };

        if height + total < kernel || width + total < kernel {
            return Err(MlErr::InvalidSpec(format!(
                "a {kernel}x{kernel} kernel doesn't fit a {height}x{width} input"
            )));
        }

        let patches = Patches {
            channels,
            height,
            width,
            kernel,
            pad,
            out_height: height + total - kernel + 1,
            out_width: width + total - kernel + 1,
        };

        let empty = Array3::zeros((0, 0, 0));

        Ok(Self {
            size: (patches.rows() + 1) * filters,
            patches,
            filters,
            act_fn,
            max_norm,
            init,
            cols: empty.clone(),
            z: empty.clone(),
            a: empty,
        })
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The `(filters, height, width)` shape of a single output sample.
    pub fn output_shape(&self) -> Vec<usize> {
        vec![self.filters, self.patches.out_height, self.patches.out_width]
    }

    pub fn act_fn(&self) -> Option<ActFn> {
        self.act_fn
    }

    pub fn max_norm(&self) -> Option<MaxNorm> {
        self.max_norm
    }

    /// Writes the initial value of this layer's parameters.
    pub fn init(&self, rng: &mut dyn RngCore, params: &mut [f32]) {
        let (w, b) = params.split_at_mut(self.size - self.filters);
        self.init.fill(rng, w);
        Initializer::zeros().fill(rng, b);
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = standard(x.into_dimensionality::<Ix4>()?);
        let (n, channels, height, width) = x.dim();
        let p = self.patches;

        if (channels, height, width) != (p.channels, p.height, p.width) {
            return Err(MlErr::ShapeMismatch {
                what: "conv2d input",
                got: vec![channels, height, width],
                expected: vec![p.channels, p.height, p.width],
            });
        }

        let (w, b) = self.view_params(params)?;
        let b = b.insert_axis(Axis(1));

        if self.cols.dim() != (n, p.rows(), p.cols()) {
            self.cols = Array3::zeros((n, p.rows(), p.cols()));
            self.z = Array3::zeros((n, self.filters, p.cols()));
        }

        Zip::from(self.cols.outer_iter_mut())
            .and(self.z.outer_iter_mut())
            .and(x.outer_iter())
            .par_for_each(|mut cols, mut z, x| {
                p.im2col(x, cols.view_mut());
                linalg::general_mat_mul(1.0, &w, &cols, 0.0, &mut z);
                z += &b;
            });

        let out = match self.act_fn {
            Some(act_fn) => {
                act_fn.forward(&self.z, &mut self.a);
                self.a.clone()
            }
            None => self.z.clone(),
        };

        let shape = (n, self.filters, p.out_height, p.out_width);
        Ok(out.into_shape_with_order(shape)?.into_dyn())
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        let p = self.patches;
        let n = self.z.len_of(Axis(0));
        let mut d = standard(d).into_shape_with_order((n, self.filters, p.cols()))?;

        if let Some(act_fn) = &self.act_fn {
            act_fn.backward(&self.z, &self.a, &mut d);
        }

        let (mut dw, mut db) = self.view_grad(grad)?;
        dw.fill(0.);
        for (d, cols) in d.outer_iter().zip(self.cols.outer_iter()) {
            linalg::general_mat_mul(1.0, &d, &cols.t(), 1.0, &mut dw);
        }
        db.assign(&d.sum_axis(Axis(2)).sum_axis(Axis(0)));

        let (w, _) = self.view_params(params)?;
        let mut dx = Array4::<f32>::zeros((n, p.channels, p.height, p.width));

        Zip::from(dx.outer_iter_mut())
            .and(d.outer_iter())
            .par_for_each(|dx, d| {
                let dcols = w.t().dot(&d);
                p.col2im(dcols.view(), dx);
            });

        Ok(dx.into_dyn())
    }

    /// Rescales each kernel whose norm exceeds this layer's bound, if any.
    pub fn constrain(&self, params: &mut [f32]) -> Result<()> {
        let Some(max_norm) = self.max_norm else {
            return Ok(());
        };

        let w_size = self.size - self.filters;
        let shape = (self.filters, self.patches.rows());
        let w = ArrayViewMut2::from_shape(shape, &mut params[..w_size])?;
        max_norm.apply(w, Axis(1));
        Ok(())
    }

    /// Gives a view of the raw gradient slice as the delta kernels and delta biases of this layer.
    fn view_grad<'a>(
        &self,
        grad: &'a mut [f32],
    ) -> Result<(ArrayViewMut2<'a, f32>, ArrayViewMut1<'a, f32>)> {
        let w_size = self.size - self.filters;
        let (dw_raw, db_raw) = grad.split_at_mut(w_size);
        let dw = ArrayViewMut2::from_shape((self.filters, self.patches.rows()), dw_raw)?;
        let db = ArrayViewMut1::from_shape(self.filters, db_raw)?;
        Ok((dw, db))
    }

    /// Gives a view of the raw parameter slice as the kernels and biases of this layer.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let w_size = self.size - self.filters;
        let (w_raw, b_raw) = params.split_at(w_size);
        let w = ArrayView2::from_shape((self.filters, self.patches.rows()), w_raw)?;
        let b = ArrayView1::from_shape(self.filters, b_raw)?;
        Ok((w, b))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array, array};

    use super::*;

    fn conv(input: (usize, usize, usize), filters: usize, padding: Padding) -> Conv2d {
        Conv2d::new(input, filters, 3, padding, None, None, Initializer::zeros()).unwrap()
    }

    #[test]
    fn same_padding_keeps_spatial_size() {
        let layer = conv((3, 32, 32), 32, Padding::Same);
        assert_eq!(layer.output_shape(), [32, 32, 32]);
        assert_eq!(layer.size(), 3 * 9 * 32 + 32);
    }

    #[test]
    fn valid_padding_shrinks() {
        let layer = conv((1, 5, 4), 2, Padding::Valid);
        assert_eq!(layer.output_shape(), [2, 3, 2]);
    }

    #[test]
    fn kernel_larger_than_input_fails() {
        let res = Conv2d::new((1, 2, 2), 1, 3, Padding::Valid, None, None, Initializer::zeros());
        assert!(res.is_err());
    }

    #[test]
    fn forward_is_a_cross_correlation() {
        let mut layer = conv((1, 3, 3), 1, Padding::Valid);
        let params: Vec<f32> = (1..=9).map(|v| v as f32).chain([0.5]).collect();
        let x = Array::from_shape_vec((1, 1, 3, 3), (1..=9).map(|v| v as f32).collect()).unwrap();

        let y = layer.forward(&params, x.into_dyn()).unwrap();

        let expected: f32 = (1..=9).map(|v| (v * v) as f32).sum::<f32>() + 0.5;
        assert_eq!(y.shape(), [1, 1, 1, 1]);
        assert_eq!(y[[0, 0, 0, 0]], expected);
    }

    #[test]
    fn wrong_input_shape_is_rejected() {
        let mut layer = conv((3, 8, 8), 4, Padding::Same);
        let params = vec![0.; layer.size()];
        let x = Array4::<f32>::zeros((2, 1, 8, 8)).into_dyn();

        assert!(layer.forward(&params, x).is_err());
    }

    #[test]
    fn max_norm_caps_each_kernel() {
        let layer = Conv2d::new(
            (1, 4, 4),
            2,
            2,
            Padding::Same,
            None,
            Some(MaxNorm::new(1.)),
            Initializer::zeros(),
        )
        .unwrap();

        let mut params = vec![2., 2., 2., 2., 0.1, 0., 0., 0., 7., 7.];
        layer.constrain(&mut params).unwrap();

        let first = array![params[0], params[1], params[2], params[3]];
        assert!((first.dot(&first).sqrt() - 1.).abs() < 1e-4);
        assert_eq!(&params[4..], [0.1, 0., 0., 0., 7., 7.]);
    }
}
