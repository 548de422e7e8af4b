use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use machine_learning::{
    arch::presets,
    specs::{LayerSpec, ModelSpec, TrainerSpec, TrainingSpec},
};
use serde::Deserialize;

const DEFAULT_MAX_NORM: f32 = 3.;

/// Where the CIFAR-10 binary files live and how much of each split to use.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub train_limit: Option<usize>,
    #[serde(default)]
    pub test_limit: Option<usize>,
}

/// Which architecture to train.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelConfig {
    Shallow {
        #[serde(default = "default_max_norm")]
        max_norm: f32,
    },
    Deep {
        #[serde(default = "default_max_norm")]
        max_norm: f32,
    },
    Custom {
        input: Vec<usize>,
        layers: Vec<LayerSpec>,
    },
}

fn default_max_norm() -> f32 {
    DEFAULT_MAX_NORM
}

impl ModelConfig {
    /// Resolves the architecture for a dataset with `classes` classes.
    ///
    /// Custom layer lists are taken as they are, their last layer decides the output width.
    pub fn resolve(&self, classes: usize) -> ModelSpec {
        match self {
            Self::Shallow { max_norm } => presets::shallow(classes, *max_norm),
            Self::Deep { max_norm } => presets::deep(classes, *max_norm),
            Self::Custom { input, layers } => ModelSpec::Sequential {
                input: input.clone(),
                layers: layers.clone(),
            },
        }
    }
}

/// A whole run, as read from a JSON file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunConfig {
    pub dataset: DatasetConfig,
    pub model: ModelConfig,
    pub training: TrainingSpec,
    /// Size of the thread pool the convolutions run on, one per core when missing.
    #[serde(default)]
    pub threads: Option<usize>,
}

impl RunConfig {
    /// Reads and parses a run configuration.
    ///
    /// # Errors
    /// If the file cannot be read or isn't a valid configuration.
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("cannot read '{path}'"))?;
        serde_json::from_str(&content).with_context(|| format!("invalid config '{path}'"))
    }

    pub fn trainer_spec(&self, classes: usize) -> TrainerSpec {
        TrainerSpec {
            model: self.model.resolve(classes),
            training: self.training.clone(),
        }
    }
}
