// Random forest classifier: bootstrap-bagged CART trees.
//
// Hand-rolled rather than bound to an ML framework: the model has to
// serialize into the artifact as plain JSON and predict bit-identically after
// a reload, and the whole thing is a few hundred lines.

pub mod forest;
pub mod tree;

pub use forest::RandomForest;
pub use tree::DecisionTree;

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::TrainingError;

/// Stop request shared with a long fit. Polled before every tree and every
/// cross-validation fit; work already running finishes its current tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cancel<'a>(Option<&'a AtomicBool>);

impl<'a> Cancel<'a> {
    /// A token that never fires.
    pub fn never() -> Self {
        Cancel(None)
    }

    pub fn on(flag: &'a AtomicBool) -> Self {
        Cancel(Some(flag))
    }

    pub fn is_requested(self) -> bool {
        self.0.is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    pub fn check(self) -> Result<(), TrainingError> {
        if self.is_requested() {
            return Err(TrainingError::Cancelled);
        }
        Ok(())
    }
}

/// How many features each split considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// floor(sqrt(n)), at least 1.
    Sqrt,
    All,
    Fixed(usize),
}

impl MaxFeatures {
    pub fn resolve(self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Fixed(k) => k,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Forest hyperparameters. Defaults: 200 trees, unbounded depth, sqrt
/// feature sampling, bootstrap on, seed 42.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: crate::dataset::split::DEFAULT_SEED,
        }
    }
}

impl ForestParams {
    /// Same parameters with a different tree count and depth, as used by the
    /// grid search and the validation curve.
    pub fn with_shape(&self, n_trees: usize, max_depth: Option<usize>) -> Self {
        Self {
            n_trees,
            max_depth,
            ..self.clone()
        }
    }

    /// Short human-readable form, e.g. `n_trees=200 max_depth=None`.
    pub fn describe(&self) -> String {
        let depth = self
            .max_depth
            .map_or_else(|| "None".to_string(), |d| d.to_string());
        format!("n_trees={} max_depth={}", self.n_trees, depth)
    }
}
