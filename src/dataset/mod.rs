// Labeled datasets: the training-side view of extracted features.
//
// loader.rs turns a CSV file into raw records, prepare.rs turns raw records
// into a LabeledDataset (optionally one row per account), split.rs makes the
// reproducible train/test partition.

pub mod loader;
pub mod prepare;
pub mod split;

pub use loader::load_csv;
pub use prepare::{prepare, PrepareStats};
pub use split::{train_test_split, TrainTestSplit};

use crate::features::{FeatureSchema, FeatureVector};

/// One training row: a feature vector, its label, and the account it came
/// from when known.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub entity: Option<String>,
    pub features: FeatureVector,
    /// true = bot
    pub label: bool,
}

/// An ordered table of labeled examples sharing one feature schema.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    pub schema: FeatureSchema,
    pub examples: Vec<LabeledExample>,
}

impl LabeledDataset {
    pub fn new(schema: FeatureSchema, examples: Vec<LabeledExample>) -> Self {
        Self { schema, examples }
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Feature rows in example order.
    pub fn rows(&self) -> Vec<&[f64]> {
        self.examples.iter().map(|e| e.features.values()).collect()
    }

    pub fn labels(&self) -> Vec<bool> {
        self.examples.iter().map(|e| e.label).collect()
    }

    /// (human, bot) counts.
    pub fn class_counts(&self) -> (usize, usize) {
        let bots = self.examples.iter().filter(|e| e.label).count();
        (self.examples.len() - bots, bots)
    }

    /// A new dataset holding the examples at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            schema: self.schema.clone(),
            examples: indices.iter().map(|&i| self.examples[i].clone()).collect(),
        }
    }
}
