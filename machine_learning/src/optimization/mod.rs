mod optimizer;
mod schedule;
mod sgd;

pub use optimizer::Optimizer;
pub use schedule::InverseTimeDecay;
pub use sgd::Sgd;
