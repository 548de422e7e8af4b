use ndarray::{Array, Axis, Dimension, Zip};

use crate::specs::ActFnSpec;

/// An activation function, applied by a layer right after its affine transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ActFn {
    Relu(super::Relu),
    Sigmoid(super::Sigmoid),
    Softmax(super::Softmax),
}

impl ActFn {
    pub fn relu() -> Self {
        Self::Relu(super::Relu)
    }

    pub fn sigmoid(amp: f32) -> Self {
        Self::Sigmoid(super::Sigmoid::new(amp))
    }

    pub fn softmax() -> Self {
        Self::Softmax(super::Softmax)
    }

    pub fn from_spec(spec: ActFnSpec) -> Self {
        match spec {
            ActFnSpec::Relu => Self::relu(),
            ActFnSpec::Sigmoid { amp } => Self::sigmoid(amp),
            ActFnSpec::Softmax => Self::softmax(),
        }
    }

    /// Writes the activation of `z` into `a`, reusing its allocation when possible.
    ///
    /// Softmax normalizes over the last axis.
    pub fn forward<D: Dimension>(&self, z: &Array<f32, D>, a: &mut Array<f32, D>) {
        if a.raw_dim() != z.raw_dim() {
            *a = Array::zeros(z.raw_dim());
        }

        match self {
            Self::Relu(f) => a.zip_mut_with(z, |a, &z| *a = f.f(z)),
            Self::Sigmoid(f) => a.zip_mut_with(z, |a, &z| *a = f.f(z)),
            Self::Softmax(f) => {
                a.assign(z);
                let last = Axis(a.ndim() - 1);
                a.lanes_mut(last).into_iter().for_each(|lane| f.f(lane));
            }
        }
    }

    /// Multiplies the incoming delta `d` by the derivative of the activation, given the
    /// pre-activation `z` and the activation `a` of the last forward pass.
    pub fn backward<D: Dimension>(
        &self,
        z: &Array<f32, D>,
        a: &Array<f32, D>,
        d: &mut Array<f32, D>,
    ) {
        match self {
            Self::Relu(f) => d.zip_mut_with(z, |d, &z| *d *= f.df(z)),
            Self::Sigmoid(f) => d.zip_mut_with(z, |d, &z| *d *= f.df(z)),
            Self::Softmax(f) => {
                let last = Axis(d.ndim() - 1);
                Zip::from(d.lanes_mut(last))
                    .and(a.lanes(last))
                    .for_each(|d, a| f.backward(a, d));
            }
        }
    }

    /// The name used when summarizing a model.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Relu(_) => "relu",
            Self::Sigmoid(_) => "sigmoid",
            Self::Softmax(_) => "softmax",
        }
    }
}
