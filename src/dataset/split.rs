// Reproducible train/test split.
//
// n_test = ceil(n * fraction). Indices are shuffled with a seeded StdRng and
// the first n_test shuffled indices form the test partition, so the same
// dataset, fraction and seed always give the same partitions.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use super::LabeledDataset;
use crate::error::TrainingError;

/// Default seed for splits and forests.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: LabeledDataset,
    pub test: LabeledDataset,
}

pub fn train_test_split(
    dataset: &LabeledDataset,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, TrainingError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainingError::InvalidSplit(test_fraction));
    }
    let n = dataset.len();
    if n == 0 {
        return Err(TrainingError::EmptyDataset);
    }

    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test >= n {
        return Err(TrainingError::TooFewSamples { needed: n_test + 1, got: n });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    debug!(train = train_idx.len(), test = test_idx.len(), seed, "Split dataset");

    Ok(TrainTestSplit {
        train: dataset.subset(train_idx),
        test: dataset.subset(test_idx),
    })
}
