use ndarray::{ArrayView2, ArrayView3, ArrayViewMut2, ArrayViewMut3};

/// The geometry of a square convolution window sliding with stride 1 over a zero padded
/// `(channels, height, width)` feature map.
///
/// Unrolls every window position into a column (`im2col`) so the convolution becomes a single
/// matrix product, and folds columns back onto the feature map (`col2im`) for the backward pass.
/// Rows are ordered `(channel, kernel row, kernel column)`, columns `(output row, output column)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Patches {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    pub kernel: usize,
    pub pad: usize,
    pub out_height: usize,
    pub out_width: usize,
}

impl Patches {
    /// The number of rows of the unrolled matrix.
    pub fn rows(&self) -> usize {
        self.channels * self.kernel * self.kernel
    }

    /// The number of columns of the unrolled matrix.
    pub fn cols(&self) -> usize {
        self.out_height * self.out_width
    }

    /// Maps an output coordinate plus a kernel offset to an input coordinate, `None` when it
    /// lands on padding.
    fn source(&self, out: usize, offset: usize, len: usize) -> Option<usize> {
        (out + offset)
            .checked_sub(self.pad)
            .filter(|&i| i < len)
    }

    pub fn im2col(&self, x: ArrayView3<f32>, mut cols: ArrayViewMut2<f32>) {
        cols.fill(0.);
        let k = self.kernel;

        for c in 0..self.channels {
            for ki in 0..k {
                for kj in 0..k {
                    let mut row = cols.row_mut((c * k + ki) * k + kj);

                    for oi in 0..self.out_height {
                        let Some(i) = self.source(oi, ki, self.height) else {
                            continue;
                        };

                        for oj in 0..self.out_width {
                            if let Some(j) = self.source(oj, kj, self.width) {
                                row[oi * self.out_width + oj] = x[[c, i, j]];
                            }
                        }
                    }
                }
            }
        }
    }

    /// Accumulates every column entry back onto the input position it was copied from.
    pub fn col2im(&self, cols: ArrayView2<f32>, mut x: ArrayViewMut3<f32>) {
        x.fill(0.);
        let k = self.kernel;

        for c in 0..self.channels {
            for ki in 0..k {
                for kj in 0..k {
                    let row = cols.row((c * k + ki) * k + kj);

                    for oi in 0..self.out_height {
                        let Some(i) = self.source(oi, ki, self.height) else {
                            continue;
                        };

                        for oj in 0..self.out_width {
                            if let Some(j) = self.source(oj, kj, self.width) {
                                x[[c, i, j]] += row[oi * self.out_width + oj];
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array2, Array3};

    use super::*;

    fn same_3x3(channels: usize, height: usize, width: usize) -> Patches {
        Patches {
            channels,
            height,
            width,
            kernel: 3,
            pad: 1,
            out_height: height,
            out_width: width,
        }
    }

    #[test]
    fn center_row_is_the_input() {
        let patches = same_3x3(1, 2, 3);
        let x = Array3::from_shape_fn((1, 2, 3), |(_, i, j)| (i * 3 + j) as f32 + 1.);
        let mut cols = Array2::zeros((patches.rows(), patches.cols()));

        patches.im2col(x.view(), cols.view_mut());

        // kernel center (1, 1) is row 4
        assert_eq!(cols.row(4).to_vec(), [1., 2., 3., 4., 5., 6.]);
        // top left kernel entry only sees the input from the second output row and column on
        assert_eq!(cols.row(0).to_vec(), [0., 0., 0., 0., 1., 2.]);
    }

    #[test]
    fn col2im_counts_window_overlaps() {
        let patches = same_3x3(1, 3, 3);
        let cols = Array2::ones((patches.rows(), patches.cols()));
        let mut x = Array3::zeros((1, 3, 3));

        patches.col2im(cols.view(), x.view_mut());

        // corners belong to 4 windows, edges to 6 and the center to all 9
        assert_eq!(x[[0, 0, 0]], 4.);
        assert_eq!(x[[0, 0, 1]], 6.);
        assert_eq!(x[[0, 1, 1]], 9.);
    }
}
