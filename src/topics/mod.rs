// Topic evolution between two periods: fitted topic models, the Hungarian
// assignment solver, and the aligner that classifies topics as aligned,
// disappeared or emerging.

pub mod alignment;
pub mod hungarian;
pub mod model;
pub mod traits;
