// Training: fit a random forest directly or by cross-validated grid search.

pub mod cv;
pub mod grid;
pub mod trainer;

pub use grid::{CandidateScore, GridSearchResult, ParamGrid};
pub use trainer::{FitCost, ModelTrainer, TrainMode, TrainOutcome};
