// Model trainer: direct fit or grid search, with the fit cost measured.

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use super::cv;
use super::grid::{self, GridSearchResult, ParamGrid};
use crate::dataset::LabeledDataset;
use crate::error::TrainingError;
use crate::model::{Cancel, ForestParams, RandomForest};

/// How to fit.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainMode {
    Direct(ForestParams),
    GridSearch {
        /// Everything but tree count and depth comes from here.
        base: ForestParams,
        grid: ParamGrid,
        folds: usize,
    },
}

impl TrainMode {
    pub fn grid_search(base: ForestParams) -> Self {
        TrainMode::GridSearch {
            base,
            grid: ParamGrid::default(),
            folds: 3,
        }
    }
}

/// Wall-clock cost of producing the final model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitCost {
    pub elapsed: Duration,
}

impl FitCost {
    pub fn seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model: RandomForest,
    pub cost: FitCost,
    pub search: Option<GridSearchResult>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelTrainer<'a> {
    show_progress: bool,
    cancel: Cancel<'a>,
}

impl<'a> ModelTrainer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show an indicatif bar during grid search fits.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Stop fitting with `Cancelled` once `cancel` fires.
    pub fn with_cancel(mut self, cancel: Cancel<'a>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn train(
        &self,
        train: &LabeledDataset,
        mode: &TrainMode,
    ) -> Result<TrainOutcome, TrainingError> {
        check_trainable(train)?;
        let rows = train.rows();
        let labels = train.labels();

        match mode {
            TrainMode::Direct(params) => {
                let started = Instant::now();
                let model = RandomForest::fit_cancellable(&rows, &labels, params, self.cancel)?;
                let cost = FitCost {
                    elapsed: started.elapsed(),
                };
                info!(
                    params = %params.describe(),
                    seconds = cost.seconds(),
                    "Trained model"
                );
                Ok(TrainOutcome {
                    model,
                    cost,
                    search: None,
                })
            }
            TrainMode::GridSearch { base, grid, folds } => {
                let started = Instant::now();
                let folds = cv::stratified_folds(&labels, *folds)?;
                let pb = self
                    .show_progress
                    .then(|| progress_bar((grid.len() * folds.len()) as u64));

                let searched =
                    grid::search(base, grid, &rows, &labels, &folds, self.cancel, pb.as_ref());
                if let Some(pb) = &pb {
                    pb.finish_and_clear();
                }
                let mut result = searched?;

                let model = RandomForest::fit_cancellable(
                    &rows,
                    &labels,
                    &result.best_params,
                    self.cancel,
                )?;
                let cost = FitCost {
                    elapsed: started.elapsed(),
                };
                result.search_seconds = cost.seconds();
                info!(
                    best = %result.best_params.describe(),
                    cv_score = result.best_score,
                    seconds = cost.seconds(),
                    "Refit best grid candidate"
                );
                Ok(TrainOutcome {
                    model,
                    cost,
                    search: Some(result),
                })
            }
        }
    }
}

/// Both classes must be present to learn anything.
pub fn check_trainable(train: &LabeledDataset) -> Result<(), TrainingError> {
    if train.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    match train.class_counts() {
        (0, _) => Err(TrainingError::SingleClass { label: "bot" }),
        (_, 0) => Err(TrainingError::SingleClass { label: "human" }),
        _ => Ok(()),
    }
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  Grid search [{bar:30}] {pos}/{len} fits ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}
