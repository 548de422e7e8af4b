use ndarray::{Array4, ArrayD, Ix4, Zip};

use super::standard;
use crate::{MlErr, Result};

/// Non overlapping max pooling over square windows (stride equals the window size). Rows and
/// columns that don't fill a whole window are discarded.
#[derive(Debug, Clone)]
pub struct MaxPool2d {
    pool: usize,
    input: (usize, usize, usize),

    // Forward metadata, the flat `row * width + col` position of each window's maximum
    argmax: Array4<usize>,
}

impl MaxPool2d {
    /// Creates a new `MaxPool2d`.
    ///
    /// # Arguments
    /// * `input` - The `(channels, height, width)` shape of a single input sample.
    /// * `pool` - The side of the pooling window.
    pub fn new(input: (usize, usize, usize), pool: usize) -> Result<Self> {
        let (_, height, width) = input;
        if pool == 0 || pool > height || pool > width {
            return Err(MlErr::InvalidSpec(format!(
                "a {pool}x{pool} pool doesn't fit a {height}x{width} input"
            )));
        }

        Ok(Self {
            pool,
            input,
            argmax: Array4::zeros((0, 0, 0, 0)),
        })
    }

    pub fn output_shape(&self) -> Vec<usize> {
        let (channels, height, width) = self.input;
        vec![channels, height / self.pool, width / self.pool]
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = standard(x.into_dimensionality::<Ix4>()?);
        let (n, channels, height, width) = x.dim();

        if (channels, height, width) != self.input {
            let (c, h, w) = self.input;
            return Err(MlErr::ShapeMismatch {
                what: "max pooling input",
                got: vec![channels, height, width],
                expected: vec![c, h, w],
            });
        }

        let k = self.pool;
        let shape = (n, channels, height / k, width / k);
        let mut out = Array4::<f32>::zeros(shape);
        self.argmax = Array4::zeros(shape);

        Zip::from(out.outer_iter_mut())
            .and(self.argmax.outer_iter_mut())
            .and(x.outer_iter())
            .par_for_each(|mut out, mut argmax, x| {
                for ((c, oi, oj), max) in out.indexed_iter_mut() {
                    let mut best = (f32::NEG_INFINITY, 0);

                    for i in oi * k..(oi + 1) * k {
                        for j in oj * k..(oj + 1) * k {
                            let v = x[[c, i, j]];
                            if v > best.0 {
                                best = (v, i * width + j);
                            }
                        }
                    }

                    *max = best.0;
                    argmax[[c, oi, oj]] = best.1;
                }
            });

        Ok(out.into_dyn())
    }

    /// Routes each delta to the input position that won its window, the rest get zero.
    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let d = d.into_dimensionality::<Ix4>()?;
        let (channels, height, width) = self.input;
        let n = self.argmax.len_of(ndarray::Axis(0));
        let mut dx = Array4::<f32>::zeros((n, channels, height, width));

        Zip::from(dx.outer_iter_mut())
            .and(d.outer_iter())
            .and(self.argmax.outer_iter())
            .par_for_each(|mut dx, d, argmax| {
                Zip::indexed(&d).and(&argmax).for_each(|(c, _, _), &d, &at| {
                    dx[[c, at / width, at % width]] += d;
                });
            });

        Ok(dx.into_dyn())
    }
}
