// Training diagnostics: cross-validation scores, learning curve and
// validation curve, all computed on the training partition with 5
// stratified folds.
//
// Learning curve: for each fraction, fit on the first floor(fraction * n)
// rows of every fold's training portion (at least 1) and score on the fold's
// training subset and test rows. Validation curve: the same folds, varying
// the tree count.

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::dataset::LabeledDataset;
use crate::error::TrainingError;
use crate::model::{Cancel, ForestParams};
use crate::training::cv::{self, Fold};

pub const DIAGNOSTIC_FOLDS: usize = 5;
pub const LEARNING_CURVE_FRACTIONS: [f64; 5] = [0.1, 0.325, 0.55, 0.775, 1.0];
pub const VALIDATION_CURVE_TREES: [usize; 5] = [100, 200, 300, 400, 500];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurvePoint {
    /// Training rows (learning curve) or tree count (validation curve).
    pub x: usize,
    pub train_score: f64,
    pub validation_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub cv_scores: Vec<f64>,
    pub cv_mean: f64,
    pub cv_std: f64,
    pub learning_curve: Vec<CurvePoint>,
    pub validation_curve: Vec<CurvePoint>,
}

pub fn diagnostics(
    params: &ForestParams,
    train: &LabeledDataset,
    cancel: Cancel<'_>,
) -> Result<Diagnostics, TrainingError> {
    diagnostics_with(
        params,
        train,
        DIAGNOSTIC_FOLDS,
        &LEARNING_CURVE_FRACTIONS,
        &VALIDATION_CURVE_TREES,
        cancel,
    )
}

/// `diagnostics` with explicit fold count and curve points.
pub fn diagnostics_with(
    params: &ForestParams,
    train: &LabeledDataset,
    folds: usize,
    fractions: &[f64],
    tree_counts: &[usize],
    cancel: Cancel<'_>,
) -> Result<Diagnostics, TrainingError> {
    if train.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    let rows = train.rows();
    let labels = train.labels();
    let folds = cv::stratified_folds(&labels, folds)?;

    let cv_scores = cv::cross_val_scores(params, &rows, &labels, &folds, cancel)?;
    info!(
        mean = cv::mean(&cv_scores),
        folds = folds.len(),
        "Cross-validation done"
    );

    let learning_curve = learning_curve(params, &rows, &labels, &folds, fractions, cancel)?;
    let validation_curve =
        validation_curve(params, &rows, &labels, &folds, tree_counts, cancel)?;

    Ok(Diagnostics {
        cv_mean: cv::mean(&cv_scores),
        cv_std: cv::std_dev(&cv_scores),
        cv_scores,
        learning_curve,
        validation_curve,
    })
}

fn learning_curve(
    params: &ForestParams,
    rows: &[&[f64]],
    labels: &[bool],
    folds: &[Fold],
    fractions: &[f64],
    cancel: Cancel<'_>,
) -> Result<Vec<CurvePoint>, TrainingError> {
    let max_train = folds.iter().map(|f| f.train.len()).min().unwrap_or(0);
    let mut sizes: Vec<usize> = fractions
        .iter()
        .map(|fr| ((fr * max_train as f64).floor() as usize).clamp(1, max_train.max(1)))
        .collect();
    sizes.dedup();

    let scores: Vec<(f64, f64)> = jobs(sizes.len(), folds.len())
        .par_iter()
        .map(|&(s, f)| {
            let fold = &folds[f];
            let subset = &fold.train[..sizes[s].min(fold.train.len())];
            cv::fold_score_on(params, rows, labels, subset, &fold.test, cancel)
        })
        .collect::<Result<_, _>>()?;

    Ok(points(&sizes, &scores, folds.len()))
}

fn validation_curve(
    params: &ForestParams,
    rows: &[&[f64]],
    labels: &[bool],
    folds: &[Fold],
    tree_counts: &[usize],
    cancel: Cancel<'_>,
) -> Result<Vec<CurvePoint>, TrainingError> {
    let scores: Vec<(f64, f64)> = jobs(tree_counts.len(), folds.len())
        .par_iter()
        .map(|&(t, f)| {
            let candidate = params.with_shape(tree_counts[t], params.max_depth);
            cv::fold_score(&candidate, rows, labels, &folds[f], cancel)
        })
        .collect::<Result<_, _>>()?;

    Ok(points(tree_counts, &scores, folds.len()))
}

fn jobs(points: usize, folds: usize) -> Vec<(usize, usize)> {
    (0..points)
        .flat_map(|p| (0..folds).map(move |f| (p, f)))
        .collect()
}

/// Average each point's per-fold (train, test) scores.
fn points(xs: &[usize], scores: &[(f64, f64)], folds: usize) -> Vec<CurvePoint> {
    xs.iter()
        .zip(scores.chunks(folds.max(1)))
        .map(|(&x, chunk)| {
            let train: Vec<f64> = chunk.iter().map(|s| s.0).collect();
            let test: Vec<f64> = chunk.iter().map(|s| s.1).collect();
            CurvePoint {
                x,
                train_score: cv::mean(&train),
                validation_score: cv::mean(&test),
            }
        })
        .collect()
}
