use std::collections::BTreeSet;

use ndarray::{Array2, Array4, ArrayView1, ArrayView4};

use super::{Dataset, RawSplit};
use crate::{MlErr, Result};

/// Scales 8 bit pixel intensities onto `[0, 1]`.
pub fn normalize(images: ArrayView4<u8>) -> Array4<f32> {
    images.mapv(|p| p as f32 / 255.)
}

/// The inverse of `normalize`, exact for every image it produced.
pub fn denormalize(images: ArrayView4<f32>) -> Array4<u8> {
    images.mapv(|p| (p * 255.).round().clamp(0., 255.) as u8)
}

/// The amount of distinct labels.
pub fn count_classes(labels: ArrayView1<u8>) -> usize {
    labels.iter().collect::<BTreeSet<_>>().len()
}

/// Encodes each label as a row with a single `1` at the label's column.
///
/// # Arguments
/// * `labels` - The integer labels.
/// * `classes` - The width of each encoded row.
///
/// # Returns
/// A `(labels, classes)` matrix, or an error if a label doesn't fit in `classes` columns.
pub fn one_hot(labels: ArrayView1<u8>, classes: usize) -> Result<Array2<f32>> {
    let mut encoded = Array2::zeros((labels.len(), classes));

    for (mut row, &label) in encoded.rows_mut().into_iter().zip(labels) {
        let Some(hot) = row.get_mut(label as usize) else {
            return Err(MlErr::InvalidDataset(format!(
                "label {label} is out of range for {classes} classes"
            )));
        };

        *hot = 1.;
    }

    Ok(encoded)
}

/// The index of the largest entry of `row`, the first one on ties.
pub fn decode(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
            if v > best.1 { (i, v) } else { best }
        })
        .0
}

/// Normalizes the images and one hot encodes the labels of a split.
pub fn preprocess(raw: &RawSplit, classes: usize) -> Result<Dataset> {
    let x = normalize(raw.images.view());
    let y = one_hot(raw.labels.view(), classes)?;
    Dataset::new(x.into_dyn(), y)
}
