// Error taxonomy for the library.
//
// Feature extraction never fails (missing or garbled fields fall back to
// documented defaults), so there is no extraction error here. What can fail:
// - training (empty or single-class data, bad split or grid settings)
// - persistence (reading or writing the artifact file)
// - schema validation (artifact layout disagrees with the extractor)
//
// The binary wraps all of these in anyhow; the web layer matches on them to
// pick a status code.

use std::path::PathBuf;

use thiserror::Error;

/// The artifact's feature layout disagrees with what the active extractor
/// produces. Never recoverable by coercion: retrain, or deploy an extractor
/// that knows the artifact's layout.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaMismatchError {
    #[error("feature schema v{version} is not known to this extractor (supported: {supported:?})")]
    UnknownVersion { version: u32, supported: Vec<u32> },

    #[error(
        "feature schema v{version} layout differs from the extractor's \
         (missing: {missing:?}, unexpected: {unexpected:?}, reordered: {reordered})"
    )]
    LayoutDiffers {
        version: u32,
        missing: Vec<String>,
        unexpected: Vec<String>,
        reordered: bool,
    },

    #[error("model expects {model_width} features but schema v{version} has {schema_width}")]
    WidthMismatch {
        version: u32,
        model_width: usize,
        schema_width: usize,
    },
}

/// Fatal problems while preparing data or fitting a model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainingError {
    #[error("dataset is empty; nothing to train or evaluate on")]
    EmptyDataset,

    #[error("training data only contains the {label} class; a classifier needs both")]
    SingleClass { label: &'static str },

    #[error("need at least {needed} samples for this operation, got {got}")]
    TooFewSamples { needed: usize, got: usize },

    #[error("held-out fraction must be between 0 and 1 (exclusive), got {0}")]
    InvalidSplit(f64),

    #[error("invalid hyperparameter grid: {0}")]
    InvalidGrid(String),

    #[error("training run was cancelled")]
    Cancelled,
}

/// I/O or format failures reading or writing an artifact.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("artifact at {path} has unsupported format {found}")]
    UnsupportedFormat { path: PathBuf, found: String },
}

impl PersistenceError {
    /// Plain I/O failures may succeed on retry; corrupt or foreign files won't.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PersistenceError::Io { .. })
    }
}

/// Everything that can go wrong loading an artifact for serving.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Schema(#[from] SchemaMismatchError),
}

impl ArtifactError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ArtifactError::Persistence(e) => e.is_retryable(),
            ArtifactError::Schema(_) => false,
        }
    }

    /// A schema mismatch means the artifact must be retrained (or the
    /// extractor redeployed); persistence errors don't.
    pub fn needs_retraining(&self) -> bool {
        matches!(self, ArtifactError::Schema(_))
    }
}
