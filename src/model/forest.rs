// Random forest: fit trees in parallel, average their leaf probabilities.
//
// Tree i draws its bootstrap sample and feature subsets from
// StdRng::seed_from_u64(seed + i), so a fit is reproducible regardless of
// how rayon schedules the trees.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::tree::DecisionTree;
use super::{Cancel, ForestParams};
use crate::error::TrainingError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    params: ForestParams,
    n_features: usize,
    trees: Vec<DecisionTree>,
    /// Mean decrease in impurity per feature, summing to 1 (or all zero).
    importances: Vec<f64>,
}

impl RandomForest {
    /// Fit a forest on `rows` (all the same width) and their labels.
    /// Single-class data is accepted and yields a constant model; callers
    /// that need both classes check before fitting.
    pub fn fit(
        rows: &[&[f64]],
        labels: &[bool],
        params: &ForestParams,
    ) -> Result<Self, TrainingError> {
        Self::fit_cancellable(rows, labels, params, Cancel::never())
    }

    /// `fit`, giving up with `Cancelled` before the next tree once `cancel`
    /// fires.
    pub fn fit_cancellable(
        rows: &[&[f64]],
        labels: &[bool],
        params: &ForestParams,
        cancel: Cancel<'_>,
    ) -> Result<Self, TrainingError> {
        if rows.is_empty() {
            return Err(TrainingError::EmptyDataset);
        }
        if rows.len() != labels.len() {
            return Err(TrainingError::TooFewSamples {
                needed: rows.len(),
                got: labels.len(),
            });
        }
        if params.n_trees == 0 {
            return Err(TrainingError::InvalidGrid(
                "tree count must be at least 1".to_string(),
            ));
        }
        let n_features = rows[0].len();
        let n = rows.len();

        let fitted: Vec<(DecisionTree, Vec<f64>)> = (0..params.n_trees)
            .into_par_iter()
            .map(|i| -> Result<(DecisionTree, Vec<f64>), TrainingError> {
                cancel.check()?;
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(i as u64));
                let samples: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.random_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                Ok(DecisionTree::fit(rows, labels, samples, n_features, params, &mut rng))
            })
            .collect::<Result<_, TrainingError>>()?;

        let mut importances = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(fitted.len());
        for (tree, tree_importances) in fitted {
            for (total, v) in importances.iter_mut().zip(&tree_importances) {
                *total += v;
            }
            trees.push(tree);
        }
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            importances.iter_mut().for_each(|v| *v /= sum);
        }

        debug!(
            trees = trees.len(),
            rows = n,
            features = n_features,
            "Fitted random forest"
        );
        Ok(Self {
            params: params.clone(),
            n_features,
            trees,
            importances,
        })
    }

    /// Mean bot probability across trees.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(row)).sum();
        sum / self.trees.len() as f64
    }

    /// Bot when the probability is above one half.
    pub fn predict(&self, row: &[f64]) -> bool {
        self.predict_proba(row) > 0.5
    }

    pub fn predict_many(&self, rows: &[&[f64]]) -> Vec<bool> {
        rows.par_iter().map(|row| self.predict(row)).collect()
    }

    /// Fraction of rows predicted correctly.
    pub fn accuracy(&self, rows: &[&[f64]], labels: &[bool]) -> f64 {
        if rows.is_empty() {
            return 0.0;
        }
        let correct = self
            .predict_many(rows)
            .iter()
            .zip(labels)
            .filter(|(p, l)| p == l)
            .count();
        correct as f64 / rows.len() as f64
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    /// Whether a deserialized forest is internally consistent.
    pub fn is_well_formed(&self) -> bool {
        !self.trees.is_empty()
            && self.importances.len() == self.n_features
            && self.trees.iter().all(|t| t.is_well_formed(self.n_features))
    }
}
