//! The two reference convolutional classifiers for `3x32x32` images.

use crate::specs::{ActFnSpec, LayerSpec, ModelSpec};

/// The `(channels, height, width)` shape both presets expect.
pub const INPUT_SHAPE: [usize; 3] = [3, 32, 32];

/// A single convolutional block followed by a wide dense layer.
///
/// # Arguments
/// * `classes` - The amount of output classes.
/// * `max_norm` - The bound on the norm of the constrained layers' kernels.
pub fn shallow(classes: usize, max_norm: f32) -> ModelSpec {
    let layers = vec![
        LayerSpec::conv_relu(32, Some(max_norm)),
        LayerSpec::dropout(0.2),
        LayerSpec::conv_relu(32, Some(max_norm)),
        LayerSpec::max_pool(2),
        LayerSpec::Flatten,
        LayerSpec::dense(512, ActFnSpec::Relu, Some(max_norm)),
        LayerSpec::dropout(0.5),
        LayerSpec::dense(classes, ActFnSpec::Softmax, None),
    ];

    ModelSpec::Sequential {
        input: INPUT_SHAPE.to_vec(),
        layers,
    }
}

/// Three convolutional blocks of 32, 64 and 128 filters halving the spatial extent each, then
/// two constrained dense layers.
///
/// Unlike `shallow`, the convolutions carry no norm constraint.
///
/// # Arguments
/// * `classes` - The amount of output classes.
/// * `max_norm` - The bound on the norm of the dense layers' weights.
pub fn deep(classes: usize, max_norm: f32) -> ModelSpec {
    let mut layers = Vec::new();

    for filters in [32, 64, 128] {
        layers.extend([
            LayerSpec::conv_relu(filters, None),
            LayerSpec::dropout(0.2),
            LayerSpec::conv_relu(filters, None),
            LayerSpec::max_pool(2),
        ]);
    }

    layers.extend([
        LayerSpec::Flatten,
        LayerSpec::dropout(0.2),
        LayerSpec::dense(1024, ActFnSpec::Relu, Some(max_norm)),
        LayerSpec::dropout(0.2),
        LayerSpec::dense(512, ActFnSpec::Relu, Some(max_norm)),
        LayerSpec::dropout(0.2),
        LayerSpec::dense(classes, ActFnSpec::Softmax, None),
    ]);

    ModelSpec::Sequential {
        input: INPUT_SHAPE.to_vec(),
        layers,
    }
}
