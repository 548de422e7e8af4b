use ndarray::ArrayD;
use rand::RngCore;

use super::{Conv2d, Dense, Dropout, Flatten, MaxPool2d};
use crate::{
    MlErr, Result,
    arch::{activations::ActFn, constraint::MaxNorm},
    initialization::Initializer,
    specs::{ActFnSpec, InitSpec, LayerSpec},
};

/// A layer of a `Sequential` model.
#[derive(Debug, Clone)]
pub enum Layer {
    Conv2d(Conv2d),
    MaxPool2d(MaxPool2d),
    Dropout(Dropout),
    Flatten(Flatten),
    Dense(Dense),
}

/// Splits a single sample shape into `(channels, height, width)`.
fn feature_map(what: &'static str, input: &[usize]) -> Result<(usize, usize, usize)> {
    match *input {
        [c, h, w] => Ok((c, h, w)),
        _ => Err(MlErr::InvalidSpec(format!(
            "{what} expects a (channels, height, width) input, got {input:?}"
        ))),
    }
}

/// Resolves an optional max-norm bound, which must be positive and finite.
fn max_norm(what: &'static str, bound: Option<f32>) -> Result<Option<MaxNorm>> {
    match bound {
        Some(b) if !b.is_finite() || b <= 0. => Err(MlErr::InvalidSpec(format!(
            "{what} max norm must be positive and finite, got {b}"
        ))),
        bound => Ok(bound.map(MaxNorm::new)),
    }
}

impl Layer {
    /// Resolves a layer spec given the shape of a single input sample.
    ///
    /// # Arguments
    /// * `spec` - The layer's specification.
    /// * `input` - The shape of a single sample reaching the layer, without the batch axis.
    ///
    /// # Returns
    /// The new layer or an error if the spec doesn't fit the input shape or holds invalid values.
    pub fn build(spec: LayerSpec, input: &[usize]) -> Result<Self> {
        let layer = match spec {
            LayerSpec::Conv2d {
                filters,
                kernel_size,
                padding,
                act_fn,
                max_norm: bound,
                init,
            } => {
                let input = feature_map("conv2d", input)?;
                if matches!(act_fn, Some(ActFnSpec::Softmax)) {
                    return Err(MlErr::InvalidSpec(
                        "conv2d can't use a softmax activation, flatten into a dense layer first"
                            .into(),
                    ));
                }

                let window = kernel_size * kernel_size;
                let init = Initializer::from_spec(
                    init.unwrap_or(InitSpec::GlorotUniform),
                    input.0 * window,
                    filters * window,
                )?;

                Self::Conv2d(Conv2d::new(
                    input,
                    filters,
                    kernel_size,
                    padding,
                    act_fn.map(ActFn::from_spec),
                    max_norm("conv2d", bound)?,
                    init,
                )?)
            }
            LayerSpec::MaxPool2d { pool_size } => {
                let input = feature_map("max_pool2d", input)?;
                Self::MaxPool2d(MaxPool2d::new(input, pool_size)?)
            }
            LayerSpec::Dropout { rate } => Self::Dropout(Dropout::new(rate)?),
            LayerSpec::Flatten => Self::Flatten(Flatten::new()),
            LayerSpec::Dense {
                units,
                act_fn,
                max_norm: bound,
                init,
            } => {
                let &[inputs] = input else {
                    return Err(MlErr::InvalidSpec(format!(
                        "dense expects a flat input, got {input:?}, add a flatten layer first"
                    )));
                };

                let init = Initializer::from_spec(
                    init.unwrap_or(InitSpec::GlorotUniform),
                    inputs,
                    units,
                )?;

                Self::Dense(Dense::new(
                    (inputs, units),
                    act_fn.map(ActFn::from_spec),
                    max_norm("dense", bound)?,
                    init,
                ))
            }
        };

        Ok(layer)
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        match self {
            Self::Conv2d(l) => l.size(),
            Self::Dense(l) => l.size(),
            Self::MaxPool2d(_) | Self::Dropout(_) | Self::Flatten(_) => 0,
        }
    }

    /// The shape of a single output sample given the shape of a single input sample.
    pub fn output_shape(&self, input: &[usize]) -> Vec<usize> {
        match self {
            Self::Conv2d(l) => l.output_shape(),
            Self::MaxPool2d(l) => l.output_shape(),
            Self::Dense(l) => vec![l.units()],
            Self::Flatten(_) => vec![input.iter().product()],
            Self::Dropout(_) => input.to_vec(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Conv2d(_) => "conv2d",
            Self::MaxPool2d(_) => "max_pool2d",
            Self::Dropout(_) => "dropout",
            Self::Flatten(_) => "flatten",
            Self::Dense(_) => "dense",
        }
    }

    pub fn act_fn(&self) -> Option<ActFn> {
        match self {
            Self::Conv2d(l) => l.act_fn(),
            Self::Dense(l) => l.act_fn(),
            _ => None,
        }
    }

    /// Writes the initial value of this layer's parameters.
    pub fn init(&self, rng: &mut dyn RngCore, params: &mut [f32]) {
        match self {
            Self::Conv2d(l) => l.init(rng, params),
            Self::Dense(l) => l.init(rng, params),
            _ => {}
        }
    }

    /// Makes a forward pass through this layer.
    ///
    /// # Arguments
    /// * `params` - This layer's parameters.
    /// * `x` - A batch of inputs, batch axis first.
    /// * `rng` - The randomness source while training, `None` when evaluating.
    ///
    /// # Returns
    /// The batch of outputs or an error if `x` has the wrong shape.
    pub fn forward(
        &mut self,
        params: &[f32],
        x: ArrayD<f32>,
        rng: Option<&mut (dyn RngCore + '_)>,
    ) -> Result<ArrayD<f32>> {
        match self {
            Self::Conv2d(l) => l.forward(params, x),
            Self::MaxPool2d(l) => l.forward(x),
            Self::Dropout(l) => Ok(l.forward(x, rng)),
            Self::Flatten(l) => l.forward(x),
            Self::Dense(l) => l.forward(params, x),
        }
    }

    /// Makes a backward pass through this layer, writing its slice of the gradient.
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
        match self {
            Self::Conv2d(l) => l.backward(params, grad, d),
            Self::MaxPool2d(l) => l.backward(d),
            Self::Dropout(l) => Ok(l.backward(d)),
            Self::Flatten(l) => l.backward(d),
            Self::Dense(l) => l.backward(params, grad, d),
        }
    }

    /// Projects this layer's parameters back onto its constraint, if it has one.
    pub fn constrain(&self, params: &mut [f32]) -> Result<()> {
        match self {
            Self::Conv2d(l) => l.constrain(params),
            Self::Dense(l) => l.constrain(params),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specs::Padding;

    #[test]
    fn shapes_flow_through_a_block() {
        let specs = [
            LayerSpec::conv_relu(32, Some(3.)),
            LayerSpec::dropout(0.2),
            LayerSpec::max_pool(2),
            LayerSpec::Flatten,
            LayerSpec::dense(10, ActFnSpec::Softmax, None),
        ];

        let mut shape = vec![3, 32, 32];
        let mut sizes = Vec::new();
        for spec in specs {
            let layer = Layer::build(spec, &shape).unwrap();
            shape = layer.output_shape(&shape);
            sizes.push(layer.size());
        }

        assert_eq!(shape, [10]);
        assert_eq!(sizes, [896, 0, 0, 0, 8192 * 10 + 10]);
    }

    #[test]
    fn dense_needs_a_flat_input() {
        let spec = LayerSpec::dense(10, ActFnSpec::Relu, None);
        assert!(Layer::build(spec, &[3, 32, 32]).is_err());
    }

    #[test]
    fn conv_needs_a_feature_map() {
        assert!(Layer::build(LayerSpec::conv_relu(8, None), &[100]).is_err());
    }

    #[test]
    fn max_norm_must_be_positive_and_finite() {
        for bound in [0., -3., f32::NAN, f32::INFINITY] {
            let dense = LayerSpec::dense(4, ActFnSpec::Relu, Some(bound));
            let conv = LayerSpec::conv_relu(8, Some(bound));

            assert!(matches!(Layer::build(dense, &[16]), Err(MlErr::InvalidSpec(_))));
            assert!(matches!(Layer::build(conv, &[3, 8, 8]), Err(MlErr::InvalidSpec(_))));
        }

        let layer = Layer::build(LayerSpec::dense(4, ActFnSpec::Relu, Some(0.5)), &[16]).unwrap();
        assert_eq!(layer.size(), 16 * 4 + 4);
    }

    #[test]
    fn conv_rejects_softmax() {
        let spec = LayerSpec::Conv2d {
            filters: 8,
            kernel_size: 3,
            padding: Padding::Same,
            act_fn: Some(ActFnSpec::Softmax),
            max_norm: None,
            init: None,
        };

        assert!(matches!(Layer::build(spec, &[3, 8, 8]), Err(MlErr::InvalidSpec(_))));
    }
}
