use std::num::NonZeroUsize;

use ndarray::{ArrayView2, Zip};

use crate::{
    MlErr, Result,
    arch::{Model, loss::LossFn},
    dataset::{Dataset, preprocessing::decode},
};

/// The loss and accuracy of a model over a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: f32,
}

/// The amount of rows whose arg max matches the arg max of the expected row.
///
/// # Panics
/// If `y_pred` and `y` have different shapes.
pub fn correct_predictions(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> usize {
    Zip::from(y_pred.rows())
        .and(y.rows())
        .fold(0, |correct, p, y| correct + usize::from(decode(p) == decode(y)))
}

/// The fraction of rows whose arg max matches the arg max of the expected row.
pub fn accuracy(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
    if y.nrows() == 0 {
        return 0.;
    }

    correct_predictions(y_pred, y) as f32 / y.nrows() as f32
}

/// Accumulates batch results, weighting each batch's mean loss by its size.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    loss: f64,
    correct: usize,
    samples: usize,
}

impl Tally {
    pub fn add(&mut self, loss: f32, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) {
        self.loss += loss as f64 * y.nrows() as f64;
        self.correct += correct_predictions(y_pred, y);
        self.samples += y.nrows();
    }

    pub fn finish(&self) -> Evaluation {
        if self.samples == 0 {
            return Evaluation::default();
        }

        Evaluation {
            loss: (self.loss / self.samples as f64) as f32,
            accuracy: self.correct as f32 / self.samples as f32,
        }
    }
}

/// Evaluates a model over a dataset without touching its parameters, dropout disabled.
///
/// # Arguments
/// * `model` - The model to evaluate.
/// * `loss_fn` - The loss function.
/// * `dataset` - The samples to predict.
/// * `batch_size` - The amount of samples forwarded at once.
///
/// # Returns
/// The mean loss and the accuracy over the whole dataset, or an error if the model's output
/// doesn't match the width of the labels.
pub fn evaluate<M, L>(
    model: &mut M,
    loss_fn: &L,
    dataset: &Dataset,
    batch_size: NonZeroUsize,
) -> Result<Evaluation>
where
    M: Model,
    L: LossFn,
{
    let mut tally = Tally::default();

    for (x, y) in dataset.batches(batch_size) {
        let y_pred = model.predict(x)?;
        if y_pred.dim() != y.dim() {
            return Err(MlErr::ShapeMismatch {
                what: "model output",
                got: y_pred.shape().to_vec(),
                expected: y.shape().to_vec(),
            });
        }

        let loss = loss_fn.loss(y_pred.view(), y.view());
        tally.add(loss, y_pred.view(), y.view());
    }

    Ok(tally.finish())
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn accuracy_compares_arg_maxes() {
        let y_pred = array![[0.1, 0.9], [0.8, 0.2], [0.3, 0.7]];
        let y = array![[0., 1.], [0., 1.], [0., 1.]];

        assert_eq!(correct_predictions(y_pred.view(), y.view()), 2);
        assert!((accuracy(y_pred.view(), y.view()) - 2. / 3.).abs() < 1e-6);
    }

    #[test]
    fn tally_weights_by_batch_size() {
        let mut tally = Tally::default();
        let big = array![[1., 0.], [1., 0.], [1., 0.]];
        let small = array![[1., 0.]];

        tally.add(1., big.view(), big.view());
        tally.add(5., small.view(), small.view());

        let evaluation = tally.finish();
        assert_eq!(evaluation.loss, 2.);
        assert_eq!(evaluation.accuracy, 1.);
    }

    #[test]
    fn empty_tally_is_zero() {
        assert_eq!(Tally::default().finish(), Evaluation::default());
    }
}
