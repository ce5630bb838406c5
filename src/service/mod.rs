// Prediction service: one loaded artifact, scored one record at a time.
//
// The loaded model sits behind Arc inside a parking_lot RwLock. A prediction
// clones the Arc under a read lock and scores without holding it, so a
// concurrent reload only waits for the pointer swap, and in-flight requests
// finish on the model they started with. A reload that fails validation
// leaves the current model in place.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::artifact::{self, ModelArtifact};
use crate::error::ArtifactError;
use crate::features::{FeatureExtractor, RawRecord};
use crate::status::ModelState;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub is_bot: bool,
    pub probability: f64,
    pub schema_version: u32,
}

/// A validated artifact ready to score.
#[derive(Debug)]
pub struct LoadedModel {
    pub artifact: ModelArtifact,
    pub state: ModelState,
}

pub struct PredictionService {
    extractor: FeatureExtractor,
    current: RwLock<Arc<LoadedModel>>,
}

impl PredictionService {
    /// Validate `artifact` against the extractor's layouts and start serving
    /// it. Fails closed on any schema disagreement.
    pub fn new(artifact: ModelArtifact, extractor: FeatureExtractor) -> Result<Self, ArtifactError> {
        let loaded = admit(artifact, &extractor)?;
        Ok(Self {
            extractor,
            current: RwLock::new(Arc::new(loaded)),
        })
    }

    pub fn load(path: &Path, extractor: FeatureExtractor) -> Result<Self, ArtifactError> {
        let artifact = artifact::load(path)?;
        Self::new(artifact, extractor)
    }

    pub fn predict(&self, record: &RawRecord) -> PredictionResult {
        let loaded = self.current();
        let schema = &loaded.artifact.schema;
        let features = self.extractor.extract_for(record, schema);
        let probability = loaded.artifact.model.predict_proba(features.values());
        PredictionResult {
            is_bot: probability > 0.5,
            probability,
            schema_version: schema.version,
        }
    }

    /// Load and validate the artifact at `path`, then swap it in.
    pub fn reload(&self, path: &Path) -> Result<(), ArtifactError> {
        let artifact = artifact::load(path).inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "Reload failed, keeping current model");
        })?;
        self.swap(artifact)
    }

    /// Validate `artifact` and make it the model new predictions use.
    pub fn swap(&self, artifact: ModelArtifact) -> Result<(), ArtifactError> {
        let loaded = admit(artifact, &self.extractor).inspect_err(|e| {
            warn!(error = %e, "Rejected replacement model, keeping current model");
        })?;
        let version = loaded.artifact.schema.version;
        *self.current.write() = Arc::new(loaded);
        info!(schema_version = version, "Swapped in new model");
        Ok(())
    }

    /// The model new predictions will use.
    pub fn current(&self) -> Arc<LoadedModel> {
        Arc::clone(&self.current.read())
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }
}

/// Loaded → Serving if the schema checks out, SchemaMismatch otherwise.
fn admit(artifact: ModelArtifact, extractor: &FeatureExtractor) -> Result<LoadedModel, ArtifactError> {
    let state = ModelState::Loaded;
    if let Err(e) = artifact.validate() {
        let _ = state.transition(ModelState::SchemaMismatch);
        return Err(e.into());
    }
    if artifact.metadata.sentiment != extractor.sentiment_name() {
        warn!(
            trained_with = %artifact.metadata.sentiment,
            serving_with = extractor.sentiment_name(),
            "Sentiment scorer differs from the one the model was trained with"
        );
    }
    let state = state
        .transition(ModelState::Serving)
        .unwrap_or(ModelState::Loaded);
    Ok(LoadedModel { artifact, state })
}
