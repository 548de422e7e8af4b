use ndarray::{Array1, Array4, Axis, s};

use crate::{MlErr, Result};

/// A labeled image split as it comes from its source, `(samples, channels, height, width)`
/// pixel intensities in `[0, 255]` and one integer class per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSplit {
    pub images: Array4<u8>,
    pub labels: Array1<u8>,
}

impl RawSplit {
    /// Creates a new `RawSplit`.
    ///
    /// # Returns
    /// An error if there isn't exactly one label per image.
    pub fn new(images: Array4<u8>, labels: Array1<u8>) -> Result<Self> {
        if images.len_of(Axis(0)) != labels.len() {
            return Err(MlErr::SizeMismatch {
                what: "labels",
                got: labels.len(),
                expected: images.len_of(Axis(0)),
            });
        }

        Ok(Self { images, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Keeps only the first `n` samples, if there are more.
    pub fn truncate(&mut self, n: usize) {
        if n >= self.len() {
            return;
        }

        self.images = self.images.slice(s![..n, .., .., ..]).to_owned();
        self.labels = self.labels.slice(s![..n]).to_owned();
    }
}

/// A source of a `(train, test)` pair of labeled image splits.
pub trait DatasetProvider {
    /// Loads both splits.
    fn load(&self) -> Result<(RawSplit, RawSplit)>;
}

#[cfg(test)]
mod tests {
    use ndarray::Array;

    use super::*;

    #[test]
    fn mismatched_labels_fail() {
        let images = Array4::zeros((3, 1, 2, 2));
        let labels = Array1::zeros(2);
        assert!(RawSplit::new(images, labels).is_err());
    }

    #[test]
    fn truncate_keeps_the_head() {
        let images = Array::from_shape_fn((4, 1, 1, 1), |(i, ..)| i as u8);
        let labels = Array1::from_vec(vec![9, 8, 7, 6]);
        let mut split = RawSplit::new(images, labels).unwrap();

        split.truncate(10);
        assert_eq!(split.len(), 4);

        split.truncate(2);
        assert_eq!(split.len(), 2);
        assert_eq!(split.images.len_of(Axis(0)), 2);
        assert_eq!(split.labels.to_vec(), [9, 8]);
    }
}
