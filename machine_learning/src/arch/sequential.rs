use log::debug;
use ndarray::{Array2, ArrayD, Ix2};
use rand::RngCore;

use super::{Model, Summary, layers::Layer, loss::LossFn, summary::SummaryRow};
use crate::{
    MlErr, Result,
    evaluation::{Evaluation, Tally},
    optimization::Optimizer,
    specs::LayerSpec,
    training::ParamManager,
};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
#[derive(Debug, Clone)]
pub struct Sequential {
    input: Vec<usize>,
    layers: Vec<Layer>,
    param_manager: ParamManager,
}

impl Sequential {
    /// Creates a new `Sequential`, inferring the shape every layer receives and initializing the
    /// parameters.
    ///
    /// # Arguments
    /// * `input` - The shape of a single input sample.
    /// * `specs` - The layers the sequential is composed of, in order.
    /// * `rng` - The randomness source for the initial parameters.
    ///
    /// # Returns
    /// A new `Sequential` instance or an error if a layer doesn't fit the previous one's output.
    pub fn build(input: Vec<usize>, specs: &[LayerSpec], rng: &mut dyn RngCore) -> Result<Self> {
        let mut shape = input.clone();
        let mut layers = Vec::with_capacity(specs.len());

        for &spec in specs {
            let layer = Layer::build(spec, &shape)?;
            shape = layer.output_shape(&shape);
            layers.push(layer);
        }

        let size = layers.iter().map(Layer::size).sum();
        let mut param_manager = ParamManager::new(size);
        let mut front = param_manager.front();

        for layer in &layers {
            layer.init(rng, front.next(layer.size())?);
        }

        debug!("built a sequential model of {} layers and {size} parameters", layers.len());

        Ok(Self {
            input,
            layers,
            param_manager,
        })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn params(&self) -> &[f32] {
        self.param_manager.params()
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `x` - The input data, batch axis first.
    /// * `rng` - The randomness source while training, `None` when evaluating.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn forward(
        &mut self,
        mut x: ArrayD<f32>,
        mut rng: Option<&mut (dyn RngCore + '_)>,
    ) -> Result<ArrayD<f32>> {
        if x.shape().get(1..) != Some(self.input.as_slice()) {
            return Err(MlErr::ShapeMismatch {
                what: "model input",
                got: x.shape().iter().skip(1).copied().collect(),
                expected: self.input.clone(),
            });
        }

        let mut front = self.param_manager.front();

        for layer in self.layers.iter_mut() {
            let params = front.next(layer.size())?;
            x = layer.forward(params, x, rng.as_deref_mut())?;
        }

        Ok(x)
    }

    /// Projects every constrained layer's parameters back onto its constraint.
    fn constrain(&mut self) -> Result<()> {
        let mut front = self.param_manager.front();

        for layer in &self.layers {
            layer.constrain(front.next(layer.size())?)?;
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.param_manager.len()
    }

    fn predict(&mut self, x: ArrayD<f32>) -> Result<Array2<f32>> {
        Ok(self.forward(x, None)?.into_dimensionality::<Ix2>()?)
    }

    fn backprop<O, L, I>(
        &mut self,
        optimizer: &mut O,
        loss_fn: &L,
        batches: I,
        rng: &mut dyn RngCore,
    ) -> Result<Evaluation>
    where
        O: Optimizer,
        L: LossFn,
        I: Iterator<Item = (ArrayD<f32>, Array2<f32>)>,
    {
        let mut tally = Tally::default();

        for (x, y) in batches {
            self.param_manager.zero_grad();

            let y_pred = self.forward(x, Some(&mut *rng))?;
            let y_pred = y_pred.into_dimensionality::<Ix2>()?;

            if y_pred.dim() != y.dim() {
                return Err(MlErr::ShapeMismatch {
                    what: "model output",
                    got: y_pred.shape().to_vec(),
                    expected: y.shape().to_vec(),
                });
            }

            let loss = loss_fn.loss(y_pred.view(), y.view());
            tally.add(loss, y_pred.view(), y.view());

            let mut d = loss_fn.loss_prime(y_pred.view(), y.view()).into_dyn();
            let mut back = self.param_manager.back();

            for layer in self.layers.iter_mut().rev() {
                let (params, grad) = back.next(layer.size())?;
                d = layer.backward(params, grad, d)?;
            }

            self.param_manager.optimize(optimizer)?;
            self.constrain()?;
        }

        Ok(tally.finish())
    }

    fn summary(&self) -> Summary {
        let mut shape = self.input.clone();
        let rows = self.layers.iter().map(|layer| {
            shape = layer.output_shape(&shape);

            let name = match layer.act_fn() {
                Some(act_fn) => format!("{} ({})", layer.name(), act_fn.name()),
                None => layer.name().to_string(),
            };

            SummaryRow {
                name,
                output_shape: shape.clone(),
                params: layer.size(),
            }
        });

        Summary::new(self.input.clone(), rows.collect())
    }
}
