mod cross_entropy;
mod loss_fn;
mod mse;

pub use cross_entropy::CategoricalCrossEntropy;
pub use loss_fn::LossFn;
pub use mse::Mse;
