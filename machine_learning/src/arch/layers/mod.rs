mod conv2d;
mod dense;
mod dropout;
mod flatten;
mod layer;
mod max_pool;
mod patches;

use ndarray::{Array, Dimension};

pub use conv2d::Conv2d;
pub use dense::Dense;
pub use dropout::Dropout;
pub use flatten::Flatten;
pub use layer::Layer;
pub use max_pool::MaxPool2d;

/// Makes sure `x` is laid out in row major order, copying only if it isn't.
fn standard<D: Dimension>(x: Array<f32, D>) -> Array<f32, D> {
    if x.is_standard_layout() {
        x
    } else {
        x.as_standard_layout().into_owned()
    }
}
