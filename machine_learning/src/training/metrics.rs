use crate::evaluation::Evaluation;

/// What a single epoch of training measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochMetrics {
    /// Counting from zero.
    pub epoch: usize,
    /// The learning rate at the start of the epoch.
    pub learning_rate: f32,
    /// Mean loss over the epoch's batches, measured with dropout active.
    pub loss: f32,
    pub accuracy: f32,
    /// Evaluation over the monitored split, if any.
    pub validation: Option<Evaluation>,
}

/// The metrics of every epoch of a training run, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    epochs: Vec<EpochMetrics>,
}

impl History {
    pub fn push(&mut self, metrics: EpochMetrics) {
        self.epochs.push(metrics);
    }

    pub fn epochs(&self) -> &[EpochMetrics] {
        &self.epochs
    }

    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    /// The epoch with the highest validation accuracy, the earliest one on ties.
    pub fn best_validation(&self) -> Option<&EpochMetrics> {
        self.epochs
            .iter()
            .filter(|m| m.validation.is_some())
            .fold(None, |best: Option<&EpochMetrics>, m| match best {
                Some(b) if accuracy_of(b) >= accuracy_of(m) => Some(b),
                _ => Some(m),
            })
    }
}

fn accuracy_of(metrics: &EpochMetrics) -> f32 {
    metrics.validation.map_or(f32::NEG_INFINITY, |v| v.accuracy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch(epoch: usize, val_accuracy: Option<f32>) -> EpochMetrics {
        EpochMetrics {
            epoch,
            learning_rate: 0.01,
            loss: 1.,
            accuracy: 0.5,
            validation: val_accuracy.map(|accuracy| Evaluation { loss: 1., accuracy }),
        }
    }

    #[test]
    fn keeps_epochs_in_order() {
        let mut history = History::default();
        assert!(history.is_empty());

        history.push(epoch(0, None));
        history.push(epoch(1, None));

        assert_eq!(history.len(), 2);
        assert_eq!(history.last().unwrap().epoch, 1);
    }

    #[test]
    fn best_validation_prefers_the_earliest_tie() {
        let mut history = History::default();
        history.push(epoch(0, Some(0.3)));
        history.push(epoch(1, Some(0.7)));
        history.push(epoch(2, Some(0.7)));
        history.push(epoch(3, Some(0.6)));

        assert_eq!(history.best_validation().unwrap().epoch, 1);
    }

    #[test]
    fn no_validation_no_best() {
        let mut history = History::default();
        history.push(epoch(0, None));
        assert!(history.best_validation().is_none());
    }
}
