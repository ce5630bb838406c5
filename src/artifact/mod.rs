// Model artifact: the persisted, self-describing bundle of a trained forest,
// the feature schema it was trained on, and how it was trained.
//
// On disk it is one JSON document:
//   { format, format_version, checksum, schema, metadata, model }
// The checksum is SHA-256 over the JSON of (schema, metadata, model), so a
// truncated or hand-edited file is caught before anything is scored with it.

pub mod store;

pub use store::{load, save};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::SchemaMismatchError;
use crate::features::FeatureSchema;
use crate::model::RandomForest;
use crate::training::GridSearchResult;

pub const ARTIFACT_FORMAT: &str = "botwatch-model";
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Grid search outcome as recorded in the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSummary {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub cv_score: f64,
    pub folds: usize,
    pub candidates: usize,
    pub search_seconds: f64,
}

impl From<&GridSearchResult> for GridSummary {
    fn from(result: &GridSearchResult) -> Self {
        Self {
            n_trees: result.best_params.n_trees,
            max_depth: result.best_params.max_depth,
            cv_score: result.best_score,
            folds: result.folds,
            candidates: result.candidates.len(),
            search_seconds: result.search_seconds,
        }
    }
}

/// How a model was trained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub trained_at: DateTime<Utc>,
    pub train_rows: usize,
    pub test_rows: usize,
    pub test_fraction: f64,
    pub aggregated_by_entity: bool,
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
    pub fit_seconds: f64,
    pub grid_search: Option<GridSummary>,
    pub test_accuracy: Option<f64>,
    /// Name of the sentiment scorer the features were extracted with.
    pub sentiment: String,
    pub crate_version: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub schema: FeatureSchema,
    pub metadata: TrainingMetadata,
    pub model: RandomForest,
}

impl ModelArtifact {
    pub fn new(schema: FeatureSchema, metadata: TrainingMetadata, model: RandomForest) -> Self {
        Self {
            schema,
            metadata,
            model,
        }
    }

    /// The schema must be a registered layout, name for name, and the
    /// forest must take exactly that many inputs.
    pub fn validate(&self) -> Result<(), SchemaMismatchError> {
        self.schema.validate()?;
        if self.model.n_features() != self.schema.len() {
            return Err(SchemaMismatchError::WidthMismatch {
                version: self.schema.version,
                model_width: self.model.n_features(),
                schema_width: self.schema.len(),
            });
        }
        Ok(())
    }

    /// Hex SHA-256 over the serialized (schema, metadata, model).
    pub fn checksum(&self) -> Result<String, serde_json::Error> {
        checksum_of(&self.schema, &self.metadata, &self.model)
    }
}

pub(crate) fn checksum_of(
    schema: &FeatureSchema,
    metadata: &TrainingMetadata,
    model: &RandomForest,
) -> Result<String, serde_json::Error> {
    let body = serde_json::to_vec(&(schema, metadata, model))?;
    Ok(hex::encode(Sha256::digest(&body)))
}
