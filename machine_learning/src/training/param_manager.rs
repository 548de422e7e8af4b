use std::mem;

use crate::{MlErr, Result, optimization::Optimizer};

/// The manager of a model's parameters.
///
/// Owns the flat parameter buffer together with a gradient buffer of the same size, and hands
/// out one slice per layer when traversing the model's layers forwards or backwards.
#[derive(Debug, Clone)]
pub struct ParamManager {
    params: Vec<f32>,
    grad: Vec<f32>,
}

impl ParamManager {
    /// Creates a new `ParamManager`.
    ///
    /// # Arguments
    /// * `size` - The amount of parameters of the model.
    ///
    /// # Returns
    /// A new `ParamManager` instance with every parameter and gradient set to zero.
    pub fn new(size: usize) -> Self {
        Self {
            params: vec![0.0; size],
            grad: vec![0.0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn grad(&self) -> &[f32] {
        &self.grad
    }

    /// Creates a new `FrontIter` parameter iterator.
    ///
    /// The returned iterator iterates the model's layers forward.
    ///
    /// # Returns
    /// A new `FrontIter` instance.
    pub fn front(&mut self) -> FrontIter<'_> {
        FrontIter {
            params: &mut self.params,
        }
    }

    /// Creates a new `BackIter` parameter iterator.
    ///
    /// The returned iterator iterates the model's layers backwards.
    ///
    /// # Returns
    /// A new `BackIter` instance.
    pub fn back(&mut self) -> BackIter<'_> {
        BackIter {
            params: &mut self.params,
            grad: &mut self.grad,
        }
    }

    /// Applies the gradient onto the parameters of the model.
    ///
    /// # Arguments
    /// * `optimizer` - The optimizer dictating the update rule.
    pub fn optimize<O: Optimizer>(&mut self, optimizer: &mut O) -> Result<()> {
        optimizer.update_params(&self.grad, &mut self.params)
    }

    /// Zeroes out the gradient.
    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }
}

/// A model's layer iterator.
///
/// This iterator iterates the layers of a model from the front.
pub struct FrontIter<'pm> {
    params: &'pm mut [f32],
}

impl<'pm> FrontIter<'pm> {
    /// Tries to yield the next layer's parameters.
    ///
    /// # Arguments
    /// * `n` - The amount of parameters to take.
    ///
    /// # Returns
    /// The next `n` parameters or an error if there are less than `n` left.
    pub fn next(&mut self, n: usize) -> Result<&'pm mut [f32]> {
        let params = mem::take(&mut self.params);

        if n > params.len() {
            return Err(MlErr::SizeMismatch {
                what: "layer parameters",
                got: params.len(),
                expected: n,
            });
        }

        let (head, tail) = params.split_at_mut(n);
        self.params = tail;
        Ok(head)
    }

    /// The amount of parameters not yet taken.
    pub fn remaining(&self) -> usize {
        self.params.len()
    }
}

/// A model's layer iterator.
///
/// This iterator iterates the layers of a model from the back.
pub struct BackIter<'pm> {
    params: &'pm mut [f32],
    grad: &'pm mut [f32],
}

impl<'pm> BackIter<'pm> {
    /// Tries to yield the next layer's parameters and gradient, starting from the last layer.
    ///
    /// # Arguments
    /// * `n` - The amount of parameters to take.
    ///
    /// # Returns
    /// The parameters and gradient of the layer or an error if there are less than `n` left.
    pub fn next(&mut self, n: usize) -> Result<(&'pm [f32], &'pm mut [f32])> {
        let params = mem::take(&mut self.params);
        let grad = mem::take(&mut self.grad);

        if n > params.len() {
            return Err(MlErr::SizeMismatch {
                what: "layer parameters",
                got: params.len(),
                expected: n,
            });
        }

        let at = params.len() - n;
        let (params_head, params_tail) = params.split_at_mut(at);
        let (grad_head, grad_tail) = grad.split_at_mut(at);
        self.params = params_head;
        self.grad = grad_head;

        Ok((params_tail, grad_tail))
    }
}
