pub mod cifar10;
mod in_memory;
pub mod preprocessing;
mod provider;

pub use cifar10::Cifar10;
pub use in_memory::Dataset;
pub use provider::{DatasetProvider, RawSplit};
