//! Declarative, serializable descriptions of models and training runs.
//!
//! Specs are plain configuration data. They are resolved into live layers, optimizers and
//! loss functions by the `TrainerBuilder`.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// The specification for the `ActFn` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    Relu,
    Softmax,
    Sigmoid { amp: f32 },
}

/// Spatial padding mode of a convolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    /// Zero padding such that the output keeps the input's spatial size.
    #[default]
    Same,
    /// No padding at all.
    Valid,
}

/// The specification for the `Initializer` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitSpec {
    GlorotUniform,
    GlorotNormal,
    HeNormal,
    LecunUniform,
    LecunNormal,
    Uniform { low: f32, high: f32 },
    Normal { mean: f32, std_dev: f32 },
    Const { value: f32 },
}

/// The specification for the `Layer` enum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Conv2d {
        filters: usize,
        kernel_size: usize,
        #[serde(default)]
        padding: Padding,
        #[serde(default)]
        act_fn: Option<ActFnSpec>,
        #[serde(default)]
        max_norm: Option<f32>,
        #[serde(default)]
        init: Option<InitSpec>,
    },
    MaxPool2d {
        pool_size: usize,
    },
    Dropout {
        rate: f32,
    },
    Flatten,
    Dense {
        units: usize,
        #[serde(default)]
        act_fn: Option<ActFnSpec>,
        #[serde(default)]
        max_norm: Option<f32>,
        #[serde(default)]
        init: Option<InitSpec>,
    },
}

impl LayerSpec {
    /// A 3x3 "same" convolution with a rectified linear activation.
    pub fn conv_relu(filters: usize, max_norm: Option<f32>) -> Self {
        Self::Conv2d {
            filters,
            kernel_size: 3,
            padding: Padding::Same,
            act_fn: Some(ActFnSpec::Relu),
            max_norm,
            init: None,
        }
    }

    pub fn dense(units: usize, act_fn: ActFnSpec, max_norm: Option<f32>) -> Self {
        Self::Dense {
            units,
            act_fn: Some(act_fn),
            max_norm,
            init: None,
        }
    }

    pub fn dropout(rate: f32) -> Self {
        Self::Dropout { rate }
    }

    pub fn max_pool(pool_size: usize) -> Self {
        Self::MaxPool2d { pool_size }
    }
}

/// The specification for the `Model` trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSpec {
    Sequential {
        /// The shape of a single sample, without the batch axis.
        input: Vec<usize>,
        layers: Vec<LayerSpec>,
    },
}

/// The specification for the `LossFn` trait.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossFnSpec {
    #[default]
    CategoricalCrossEntropy,
    Mse,
}

/// How often the inverse time decay of the learning rate ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayInterval {
    #[default]
    Epoch,
    Step,
}

/// The specification for the `Optimizer` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    Sgd {
        learning_rate: f32,
        #[serde(default)]
        momentum: f32,
        #[serde(default)]
        nesterov: bool,
        /// Defaults to `learning_rate / epochs` when missing.
        #[serde(default)]
        decay: Option<f32>,
        #[serde(default)]
        decay_interval: DecayInterval,
    },
}

/// Which data the trainer monitors after each epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSpec {
    /// Monitor the test split. Leaks test information into any model selection decision.
    #[default]
    TestSplit,
    /// Hold out the last `fraction` of the training split.
    Holdout { fraction: f32 },
    Disabled,
}

/// The training configuration, immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSpec {
    pub epochs: NonZeroUsize,
    pub batch_size: NonZeroUsize,
    pub optimizer: OptimizerSpec,
    #[serde(default)]
    pub loss: LossFnSpec,
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    #[serde(default)]
    pub validation: ValidationSpec,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_shuffle() -> bool {
    true
}

/// The specification for the `Trainer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerSpec {
    pub model: ModelSpec,
    pub training: TrainingSpec,
}
