// Stratified k-fold cross-validation.
//
// No shuffling: each class's indices are cut, in order, into k contiguous
// chunks (the first n % k chunks one larger), and fold f tests on chunk f of
// every class. Folds are fitted in parallel; scores come back in fold order.

use rayon::prelude::*;

use crate::error::TrainingError;
use crate::model::{Cancel, ForestParams, RandomForest};

/// One train/test partition of row indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Build `k` stratified folds over `labels`.
pub fn stratified_folds(labels: &[bool], k: usize) -> Result<Vec<Fold>, TrainingError> {
    if k < 2 {
        return Err(TrainingError::InvalidGrid(format!(
            "cross-validation needs at least 2 folds, got {k}"
        )));
    }
    let bots: Vec<usize> = (0..labels.len()).filter(|&i| labels[i]).collect();
    let humans: Vec<usize> = (0..labels.len()).filter(|&i| !labels[i]).collect();
    let largest = bots.len().max(humans.len());
    if largest < k {
        return Err(TrainingError::TooFewSamples {
            needed: k,
            got: largest,
        });
    }

    let mut tests: Vec<Vec<usize>> = vec![Vec::new(); k];
    for class in [&humans, &bots] {
        for (fold, chunk) in chunks(class.len(), k).into_iter().enumerate() {
            tests[fold].extend_from_slice(&class[chunk]);
        }
    }

    Ok(tests
        .into_iter()
        .map(|mut test| {
            test.sort_unstable();
            let train = (0..labels.len())
                .filter(|i| test.binary_search(i).is_err())
                .collect();
            Fold { train, test }
        })
        .collect())
}

/// Contiguous ranges splitting `n` items into `k` near-equal chunks.
fn chunks(n: usize, k: usize) -> Vec<std::ops::Range<usize>> {
    let base = n / k;
    let extra = n % k;
    let mut start = 0;
    (0..k)
        .map(|f| {
            let len = base + usize::from(f < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

/// Fit on each fold's training rows and score accuracy on its test rows.
pub fn cross_val_scores(
    params: &ForestParams,
    rows: &[&[f64]],
    labels: &[bool],
    folds: &[Fold],
    cancel: Cancel<'_>,
) -> Result<Vec<f64>, TrainingError> {
    folds
        .par_iter()
        .map(|fold| fold_score(params, rows, labels, fold, cancel).map(|(_, test)| test))
        .collect()
}

/// (train accuracy, test accuracy) for one fold.
pub fn fold_score(
    params: &ForestParams,
    rows: &[&[f64]],
    labels: &[bool],
    fold: &Fold,
    cancel: Cancel<'_>,
) -> Result<(f64, f64), TrainingError> {
    fold_score_on(params, rows, labels, &fold.train, &fold.test, cancel)
}

/// (train accuracy, test accuracy) fitting on `train_idx` only.
pub fn fold_score_on(
    params: &ForestParams,
    rows: &[&[f64]],
    labels: &[bool],
    train_idx: &[usize],
    test_idx: &[usize],
    cancel: Cancel<'_>,
) -> Result<(f64, f64), TrainingError> {
    cancel.check()?;
    let (train_rows, train_labels) = gather(rows, labels, train_idx);
    let (test_rows, test_labels) = gather(rows, labels, test_idx);
    let model = RandomForest::fit_cancellable(&train_rows, &train_labels, params, cancel)?;
    Ok((
        model.accuracy(&train_rows, &train_labels),
        model.accuracy(&test_rows, &test_labels),
    ))
}

pub(crate) fn gather<'a>(
    rows: &[&'a [f64]],
    labels: &[bool],
    idx: &[usize],
) -> (Vec<&'a [f64]>, Vec<bool>) {
    (
        idx.iter().map(|&i| rows[i]).collect(),
        idx.iter().map(|&i| labels[i]).collect(),
    )
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}
