pub mod activations;
pub mod constraint;
pub mod layers;
pub mod loss;
mod model;
pub mod presets;
mod sequential;
mod summary;

pub use model::Model;
pub use sequential::Sequential;
pub use summary::{Summary, SummaryRow};
