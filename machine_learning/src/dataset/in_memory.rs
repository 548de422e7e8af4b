use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayD, Axis};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// A supervised dataset, samples along the first axis of both `x` and `y`.
///
/// Shuffling only permutes the visitation order, the data itself never moves.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: ArrayD<f32>,
    y: Array2<f32>,
    order: Vec<usize>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The inputs, `(samples, ...)`.
    /// * `y` - The expected outputs, `(samples, outputs)`.
    ///
    /// # Returns
    /// An error if `x` and `y` hold a different amount of samples.
    pub fn new(x: ArrayD<f32>, y: Array2<f32>) -> Result<Self> {
        let samples = x.shape().first().copied().unwrap_or(0);

        if samples != y.nrows() {
            return Err(MlErr::SizeMismatch {
                what: "dataset samples",
                got: y.nrows(),
                expected: samples,
            });
        }

        Ok(Self {
            x,
            y,
            order: (0..samples).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn x(&self) -> &ArrayD<f32> {
        &self.x
    }

    pub fn y(&self) -> &Array2<f32> {
        &self.y
    }

    /// Randomly permutes the order in which `batches` visits the samples.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
    }

    /// Walks the samples in the current order in contiguous batches of `batch_size`.
    ///
    /// The last batch is smaller when `batch_size` doesn't divide the amount of samples, every
    /// sample is yielded exactly once.
    ///
    /// # Returns
    /// An iterator of `(x, y)` batch pairs.
    pub fn batches(
        &self,
        batch_size: NonZeroUsize,
    ) -> impl Iterator<Item = (ArrayD<f32>, Array2<f32>)> + '_ {
        self.order.chunks(batch_size.get()).map(|indices| {
            let x = self.x.select(Axis(0), indices);
            let y = self.y.select(Axis(0), indices);
            (x, y)
        })
    }

    /// Splits off the last `fraction` of the samples, in storage order, as a second dataset.
    ///
    /// # Arguments
    /// * `fraction` - The share of samples to hold out, in `(0, 1)`.
    ///
    /// # Returns
    /// The remaining and the held out datasets, or an error if either would end up empty.
    pub fn split_holdout(self, fraction: f32) -> Result<(Self, Self)> {
        let samples = self.len();
        let at = (samples as f32 * (1. - fraction)) as usize;

        if !(0. ..1.).contains(&fraction) || at == 0 || at == samples {
            return Err(MlErr::InvalidSpec(format!(
                "holding out {fraction} of {samples} samples leaves an empty split"
            )));
        }

        let (x_train, x_held) = self.x.view().split_at(Axis(0), at);
        let (y_train, y_held) = self.y.view().split_at(Axis(0), at);

        Ok((
            Self::new(x_train.to_owned(), y_train.to_owned())?,
            Self::new(x_held.to_owned(), y_held.to_owned())?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn indexed(samples: usize) -> Dataset {
        let x = Array::from_shape_fn((samples, 2), |(i, j)| (i * 2 + j) as f32).into_dyn();
        let y = Array::from_shape_fn((samples, 1), |(i, _)| i as f32);
        Dataset::new(x, y).unwrap()
    }

    #[test]
    fn mismatched_sample_counts_fail() {
        let x = ArrayD::zeros(vec![3, 2]);
        let y = Array2::zeros((4, 1));
        assert!(Dataset::new(x, y).is_err());
    }

    #[test]
    fn uneven_batches_cover_every_sample_once() {
        let mut dataset = indexed(10);
        dataset.shuffle(&mut StdRng::seed_from_u64(5));

        let batches: Vec<_> = dataset.batches(NonZeroUsize::new(3).unwrap()).collect();
        let sizes: Vec<_> = batches.iter().map(|(x, _)| x.len_of(Axis(0))).collect();
        assert_eq!(sizes, [3, 3, 3, 1]);

        let mut seen: Vec<usize> = batches
            .iter()
            .flat_map(|(x, y)| {
                // rows stay paired with their labels
                for (row, label) in x.outer_iter().zip(y.outer_iter()) {
                    assert_eq!(row.first(), Some(&(label[0] * 2.)));
                }
                y.iter().map(|&l| l as usize).collect::<Vec<_>>()
            })
            .collect();
        seen.sort_unstable();

        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_is_seeded() {
        let mut a = indexed(50);
        let mut b = indexed(50);
        a.shuffle(&mut StdRng::seed_from_u64(1));
        b.shuffle(&mut StdRng::seed_from_u64(1));

        assert_eq!(a.order, b.order);
        assert_ne!(a.order, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn holdout_takes_the_tail() {
        let (train, held) = indexed(10).split_holdout(0.2).unwrap();

        assert_eq!(train.len(), 8);
        assert_eq!(held.len(), 2);
        assert_eq!(held.y().column(0).to_vec(), [8., 9.]);
    }

    #[test]
    fn degenerate_holdout_fails() {
        assert!(indexed(10).split_holdout(0.).is_err());
        assert!(indexed(10).split_holdout(1.).is_err());
        assert!(indexed(1).split_holdout(0.5).is_err());
    }
}
