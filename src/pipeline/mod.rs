// Pipelines: multi-step jobs the CLI runs end to end.

pub mod train;

pub use train::{GridOptions, TrainOptions, TrainSummary};
