mod builder;
mod metrics;
mod model_trainer;
mod param_manager;
mod trainer;

pub use builder::TrainerBuilder;
pub use metrics::{EpochMetrics, History};
pub use model_trainer::ModelTrainer;
pub use param_manager::ParamManager;
pub use trainer::Trainer;
