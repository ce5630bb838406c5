// Artifact and serving tests: save/load fidelity, schema checks on load,
// corruption handling, and hot-swapping the served model.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serde_json::json;

use botwatch::artifact::{self, ModelArtifact, TrainingMetadata};
use botwatch::dataset::prepare;
use botwatch::error::{ArtifactError, PersistenceError, SchemaMismatchError};
use botwatch::features::{FeatureExtractor, FeatureSchema, NeutralScorer, RawRecord};
use botwatch::model::{ForestParams, RandomForest};
use botwatch::service::PredictionService;
use botwatch::status::ModelState;

fn extractor() -> FeatureExtractor {
    FeatureExtractor::new(Arc::new(NeutralScorer))
        .with_reference_time(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
}

fn bot_record(i: usize) -> RawRecord {
    RawRecord::from_json(json!({
        "Username": format!("bot{i:05}"),
        "Tweet": format!("WIN NOW!!! http://spam.example/{i} 😀"),
        "Retweet Count": 80 + i % 10,
        "Follower Count": 3 + i % 4,
        "Following Count": 900,
        "Verified": false,
        "Bot Label": 1,
    }))
    .unwrap()
}

fn human_record(i: usize) -> RawRecord {
    RawRecord::from_json(json!({
        "Username": format!("person_{}", ["ana", "ben", "cy", "di"][i % 4]),
        "Tweet": "Had a quiet walk by the river today",
        "Retweet Count": i % 5,
        "Follower Count": 400 + i,
        "Following Count": 300,
        "Verified": i % 3 == 0,
        "Bot Label": 0,
    }))
    .unwrap()
}

fn training_records(n: usize) -> Vec<RawRecord> {
    (0..n)
        .map(|i| if i % 2 == 0 { bot_record(i) } else { human_record(i) })
        .collect()
}

fn metadata(n_trees: usize) -> TrainingMetadata {
    TrainingMetadata {
        trained_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        train_rows: 40,
        test_rows: 0,
        test_fraction: 0.2,
        aggregated_by_entity: false,
        n_trees,
        max_depth: None,
        seed: 42,
        fit_seconds: 0.01,
        grid_search: None,
        test_accuracy: None,
        sentiment: "neutral".to_string(),
        crate_version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

fn trained_artifact(n_trees: usize) -> ModelArtifact {
    let (dataset, _) = prepare(&extractor(), &training_records(40), false);
    let params = ForestParams {
        n_trees,
        ..ForestParams::default()
    };
    let model = RandomForest::fit(&dataset.rows(), &dataset.labels(), &params).unwrap();
    ModelArtifact::new(dataset.schema.clone(), metadata(n_trees), model)
}

// ============================================================
// Round trip
// ============================================================

#[test]
fn reloaded_artifact_predicts_identically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let original = trained_artifact(15);
    artifact::save(&original, &path).unwrap();

    let loaded = artifact::load(&path).unwrap();
    assert_eq!(loaded, original);

    let ex = extractor();
    for record in training_records(20) {
        let features = ex.extract(&record);
        let a = original.model.predict_proba(features.values());
        let b = loaded.model.predict_proba(features.values());
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn save_replaces_existing_file_without_leaving_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    artifact::save(&trained_artifact(3), &path).unwrap();
    artifact::save(&trained_artifact(5), &path).unwrap();

    assert_eq!(artifact::load(&path).unwrap().model.n_trees(), 5);
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn save_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/results/model.json");
    artifact::save(&trained_artifact(2), &path).unwrap();
    assert!(path.exists());
}

// ============================================================
// Rejections on load
// ============================================================

#[test]
fn renamed_feature_is_a_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let mut tampered = trained_artifact(3);
    tampered.schema.names[2] = "Followers".to_string();
    artifact::save(&tampered, &path).unwrap();

    match artifact::load(&path) {
        Err(ArtifactError::Schema(SchemaMismatchError::LayoutDiffers { missing, .. })) => {
            assert_eq!(missing, vec!["Follower Count".to_string()]);
        }
        other => panic!("expected a layout mismatch, got {other:?}"),
    }
}

#[test]
fn unknown_schema_version_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let mut tampered = trained_artifact(3);
    tampered.schema.version = 99;
    artifact::save(&tampered, &path).unwrap();

    let err = artifact::load(&path).unwrap_err();
    assert!(err.needs_retraining());
    assert!(matches!(
        err,
        ArtifactError::Schema(SchemaMismatchError::UnknownVersion { version: 99, .. })
    ));
}

#[test]
fn width_disagreement_is_refused() {
    let mut tampered = trained_artifact(3);
    tampered.schema = FeatureSchema::for_version(1).unwrap();
    assert!(matches!(
        tampered.validate(),
        Err(SchemaMismatchError::WidthMismatch { model_width: 20, schema_width: 6, .. })
    ));
}

#[test]
fn edited_file_fails_the_checksum() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    artifact::save(&trained_artifact(3), &path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let edited = text.replacen("\"train_rows\":40", "\"train_rows\":41", 1);
    assert_ne!(text, edited);
    std::fs::write(&path, edited).unwrap();

    assert!(matches!(
        artifact::load(&path),
        Err(ArtifactError::Persistence(PersistenceError::Corrupt { .. }))
    ));
}

#[test]
fn truncated_and_foreign_files_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let truncated = dir.path().join("truncated.json");
    artifact::save(&trained_artifact(3), &truncated).unwrap();
    let bytes = std::fs::read(&truncated).unwrap();
    std::fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();
    assert!(matches!(
        artifact::load(&truncated),
        Err(ArtifactError::Persistence(PersistenceError::Corrupt { .. }))
    ));

    let foreign = dir.path().join("foreign.json");
    std::fs::write(&foreign, r#"{"format": "pickle", "format_version": 1}"#).unwrap();
    assert!(matches!(
        artifact::load(&foreign),
        Err(ArtifactError::Persistence(PersistenceError::UnsupportedFormat { .. }))
    ));
}

#[test]
fn missing_file_is_retryable() {
    let dir = tempfile::tempdir().unwrap();
    let err = artifact::load(&dir.path().join("nope.json")).unwrap_err();
    assert!(err.is_retryable());
    assert!(!err.needs_retraining());
}

// ============================================================
// Prediction service
// ============================================================

#[test]
fn service_scores_bots_and_humans() {
    let service = PredictionService::new(trained_artifact(15), extractor()).unwrap();
    assert_eq!(service.current().state, ModelState::Serving);

    let bot = service.predict(&bot_record(1001));
    let human = service.predict(&human_record(1001));
    assert!(bot.is_bot, "{bot:?}");
    assert!(!human.is_bot, "{human:?}");
    assert_eq!(bot.schema_version, 2);
}

#[test]
fn empty_record_still_gets_a_prediction() {
    let service = PredictionService::new(trained_artifact(5), extractor()).unwrap();
    let result = service.predict(&RawRecord::new());
    assert!((0.0..=1.0).contains(&result.probability));
    assert_eq!(result.is_bot, result.probability > 0.5);
}

#[test]
fn failed_reload_keeps_the_current_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    artifact::save(&trained_artifact(4), &path).unwrap();
    let service = PredictionService::load(&path, extractor()).unwrap();

    std::fs::write(&path, "{ not json").unwrap();
    assert!(service.reload(&path).is_err());
    assert_eq!(service.current().artifact.model.n_trees(), 4);
}

#[test]
fn swap_replaces_model_for_new_predictions_only() {
    let service = PredictionService::new(trained_artifact(4), extractor()).unwrap();
    let before = service.current();

    service.swap(trained_artifact(6)).unwrap();
    assert_eq!(before.artifact.model.n_trees(), 4);
    assert_eq!(service.current().artifact.model.n_trees(), 6);

    let mut bad = trained_artifact(2);
    bad.schema.names.reverse();
    assert!(service.swap(bad).unwrap_err().needs_retraining());
    assert_eq!(service.current().artifact.model.n_trees(), 6);
}

#[test]
fn older_schema_artifact_is_served_with_its_projection() {
    let ex = extractor();
    let schema = FeatureSchema::for_version(1).unwrap();
    let records = training_records(30);
    let rows: Vec<Vec<f64>> = records
        .iter()
        .map(|r| ex.extract_for(r, &schema).into_values())
        .collect();
    let row_refs: Vec<&[f64]> = rows.iter().map(Vec::as_slice).collect();
    let labels: Vec<bool> = (0..30).map(|i| i % 2 == 0).collect();
    let params = ForestParams {
        n_trees: 5,
        ..ForestParams::default()
    };
    let model = RandomForest::fit(&row_refs, &labels, &params).unwrap();
    let service =
        PredictionService::new(ModelArtifact::new(schema, metadata(5), model), ex).unwrap();

    assert_eq!(service.predict(&bot_record(7)).schema_version, 1);
}
