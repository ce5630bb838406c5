// Exhaustive hyperparameter grid search.
//
// Every (candidate, fold) pair is an independent fit, so the whole grid is
// one flat rayon job list. Scores are reassembled in grid order; the best
// candidate is the highest mean fold accuracy, the earlier one on a tie.

use std::time::Instant;

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::cv::{self, Fold};
use crate::error::TrainingError;
use crate::model::{Cancel, ForestParams};

/// Values to try. Candidates are ordered depth-major: every tree count for
/// the first depth, then every tree count for the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub n_trees: Vec<usize>,
    pub max_depths: Vec<Option<usize>>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_trees: vec![1000, 5000, 10000],
            max_depths: vec![Some(30), Some(40)],
        }
    }
}

impl ParamGrid {
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.n_trees.is_empty() || self.max_depths.is_empty() {
            return Err(TrainingError::InvalidGrid(
                "grid needs at least one tree count and one depth".to_string(),
            ));
        }
        if self.n_trees.contains(&0) {
            return Err(TrainingError::InvalidGrid(
                "tree counts must be at least 1".to_string(),
            ));
        }
        if self.max_depths.contains(&Some(0)) {
            return Err(TrainingError::InvalidGrid(
                "max depths must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Candidate parameter sets, `base` with each grid point applied.
    pub fn candidates(&self, base: &ForestParams) -> Vec<ForestParams> {
        self.max_depths
            .iter()
            .flat_map(|&depth| self.n_trees.iter().map(move |&n| base.with_shape(n, depth)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.n_trees.len() * self.max_depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cross-validation result for one grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub candidates: Vec<CandidateScore>,
    pub best_index: usize,
    pub best_params: ForestParams,
    pub best_score: f64,
    pub folds: usize,
    /// Wall time of the search plus the final refit.
    pub search_seconds: f64,
}

impl GridSearchResult {
    pub fn best(&self) -> &CandidateScore {
        &self.candidates[self.best_index]
    }
}

/// Score every candidate with k-fold CV. The caller refits the winner and
/// adds the refit time to `search_seconds`. Once `cancel` fires, fits not yet
/// started are skipped and running ones stop at their next tree.
pub fn search(
    base: &ForestParams,
    grid: &ParamGrid,
    rows: &[&[f64]],
    labels: &[bool],
    folds: &[Fold],
    cancel: Cancel<'_>,
    progress: Option<&ProgressBar>,
) -> Result<GridSearchResult, TrainingError> {
    grid.validate()?;
    let started = Instant::now();
    let candidates = grid.candidates(base);

    let jobs: Vec<(usize, usize)> = (0..candidates.len())
        .flat_map(|c| (0..folds.len()).map(move |f| (c, f)))
        .collect();
    info!(
        candidates = candidates.len(),
        folds = folds.len(),
        fits = jobs.len(),
        "Starting grid search"
    );

    let scores: Vec<f64> = jobs
        .par_iter()
        .map(|&(c, f)| -> Result<f64, TrainingError> {
            let (_, test) = cv::fold_score(&candidates[c], rows, labels, &folds[f], cancel)?;
            if let Some(pb) = progress {
                pb.inc(1);
            }
            Ok(test)
        })
        .collect::<Result<_, _>>()?;

    let scored: Vec<CandidateScore> = candidates
        .iter()
        .zip(scores.chunks(folds.len().max(1)))
        .map(|(params, fold_scores)| CandidateScore {
            n_trees: params.n_trees,
            max_depth: params.max_depth,
            fold_scores: fold_scores.to_vec(),
            mean_score: cv::mean(fold_scores),
            std_score: cv::std_dev(fold_scores),
        })
        .collect();

    let best_index = pick_best(&scored);
    let best_params = candidates[best_index].clone();
    let best_score = scored[best_index].mean_score;
    info!(
        best = %best_params.describe(),
        score = best_score,
        "Grid search finished"
    );

    Ok(GridSearchResult {
        candidates: scored,
        best_index,
        best_params,
        best_score,
        folds: folds.len(),
        search_seconds: started.elapsed().as_secs_f64(),
    })
}

/// Highest mean; first wins ties.
fn pick_best(scored: &[CandidateScore]) -> usize {
    let mut best = 0;
    for (i, c) in scored.iter().enumerate().skip(1) {
        if c.mean_score > scored[best].mean_score {
            best = i;
        }
    }
    best
}
