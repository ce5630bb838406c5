// Composition tests: verifying that the pipeline stages chain together.
//
// These tests exercise the data flow between modules:
//   CSV -> RawRecord -> FeatureVector -> split -> forest -> artifact -> service
// without any network calls. Everything writes into a tempdir.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde_json::json;

use botwatch::artifact;
use botwatch::error::TrainingError;
use botwatch::features::{FeatureExtractor, NeutralScorer, RawRecord};
use botwatch::model::ForestParams;
use botwatch::pipeline::{self, GridOptions, TrainOptions};
use botwatch::service::PredictionService;
use botwatch::status::ModelState;
use botwatch::training::ParamGrid;

fn extractor() -> FeatureExtractor {
    FeatureExtractor::new(Arc::new(NeutralScorer))
}

/// A dataset where bots post links in caps from digit-heavy handles and
/// humans write plain sentences. Humans post twice each, so aggregation
/// has something to collapse.
fn write_dataset(dir: &Path, rows: usize) -> PathBuf {
    let path = dir.join("bot_detection_data.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "User ID,Username,Tweet,Retweet Count,Mention Count,Follower Count,Verified,Bot Label,Location,Created At,Hashtags"
    )
    .unwrap();
    for i in 0..rows {
        if i % 2 == 0 {
            writeln!(
                file,
                "{i},bot{i:06},\"FREE FOLLOWERS!!! http://spam.example/{i}\",{},{},{},False,1,Nowhere,2024-01-0{} 03:1{}:00,#free #win #now",
                70 + i % 20,
                i % 3,
                2 + i % 9,
                1 + i % 9,
                i % 10,
            )
            .unwrap();
        } else {
            writeln!(
                file,
                "{i},reader_{},\"Finished a good book this weekend, thoughts?\",{},{},{},{},0,Leeds,2024-01-1{} 1{}:30:00,",
                ["amy", "bo", "cal", "dee", "eli", "fay"][(i / 2) % 6],
                i % 4,
                1 + i % 2,
                300 + i * 3,
                if i % 5 == 0 { "True" } else { "False" },
                i % 10,
                i % 10,
            )
            .unwrap();
        }
    }
    path
}

fn quick_options(csv: PathBuf, results: PathBuf) -> TrainOptions {
    let mut opts = TrainOptions::new(csv, results);
    opts.params = ForestParams {
        n_trees: 20,
        ..ForestParams::default()
    };
    opts.skip_diagnostics = true;
    opts
}

// ============================================================
// Chain: CSV -> train -> save -> load -> predict
// ============================================================

#[test]
fn train_then_serve_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_dataset(dir.path(), 120);
    let opts = quick_options(csv, dir.path().join("results"));

    let summary = pipeline::train::run(&opts, &extractor(), &AtomicBool::new(false)).unwrap();

    assert_eq!(summary.state, ModelState::Persisted);
    assert!(summary.model_path.exists());
    assert!(summary.evaluation.report.accuracy > 0.9);
    assert_eq!(summary.artifact.metadata.train_rows, 96);
    assert_eq!(summary.artifact.metadata.test_rows, 24);
    assert_eq!(summary.artifact.metadata.sentiment, "neutral");

    let service = PredictionService::load(&summary.model_path, extractor()).unwrap();
    let bot = RawRecord::from_json(json!({
        "username": "bot000777",
        "tweet": "FREE FOLLOWERS!!! http://spam.example/777",
        "retweet_count": 85,
        "follower_count": 4,
        "verified": false,
        "hashtags": "#free #win #now",
    }))
    .unwrap();
    assert!(service.predict(&bot).is_bot);
}

#[test]
fn reports_are_written_next_to_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_dataset(dir.path(), 80);
    let opts = quick_options(csv, dir.path().join("results"));

    let summary = pipeline::train::run(&opts, &extractor(), &AtomicBool::new(false)).unwrap();

    let metrics = std::fs::read_to_string(&summary.metrics_path).unwrap();
    assert!(metrics.contains("Classification Report"));
    assert!(metrics.contains("Confusion Matrix"));
    assert!(metrics.contains("Training Time"));

    let diag: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary.diagnostics_path).unwrap())
            .unwrap();
    assert!(diag["confusion_matrix"].is_array());
    assert_eq!(diag["feature_importances"].as_array().unwrap().len(), 20);
    assert!(diag["grid_search"].is_null());
}

#[test]
fn diagnostics_run_on_the_training_partition() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_dataset(dir.path(), 60);
    let mut opts = quick_options(csv, dir.path().join("results"));
    opts.params.n_trees = 5;
    opts.skip_diagnostics = false;

    let summary = pipeline::train::run(&opts, &extractor(), &AtomicBool::new(false)).unwrap();
    let diag = summary.diagnostics.expect("diagnostics were requested");
    assert_eq!(diag.cv_scores.len(), 5);
    assert_eq!(diag.learning_curve.len(), 5);
    assert_eq!(diag.validation_curve.len(), 5);

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary.diagnostics_path).unwrap())
            .unwrap();
    assert_eq!(written["cv_scores"].as_array().unwrap().len(), 5);
}

#[test]
fn grid_search_choice_is_recorded_in_the_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_dataset(dir.path(), 60);
    let mut opts = quick_options(csv, dir.path().join("results"));
    opts.grid = Some(GridOptions {
        grid: ParamGrid {
            n_trees: vec![3, 6],
            max_depths: vec![Some(4)],
        },
        folds: 3,
    });

    let summary = pipeline::train::run(&opts, &extractor(), &AtomicBool::new(false)).unwrap();
    let grid = summary.artifact.metadata.grid_search.as_ref().unwrap();
    assert_eq!(grid.candidates, 2);
    assert_eq!(grid.max_depth, Some(4));
    assert_eq!(summary.artifact.metadata.n_trees, grid.n_trees);

    let reloaded = artifact::load(&summary.model_path).unwrap();
    assert_eq!(reloaded.metadata.grid_search.as_ref(), Some(grid));
}

#[test]
fn aggregation_trains_on_one_row_per_account() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_dataset(dir.path(), 120);
    let mut opts = quick_options(csv, dir.path().join("results"));
    opts.aggregate_by_entity = true;

    let summary = pipeline::train::run(&opts, &extractor(), &AtomicBool::new(false)).unwrap();
    let meta = &summary.artifact.metadata;
    // 60 distinct bots plus 6 recurring human handles
    assert_eq!(meta.train_rows + meta.test_rows, 66);
    assert!(meta.aggregated_by_entity);
}

#[test]
fn cancelled_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_dataset(dir.path(), 40);
    let results = dir.path().join("results");
    let opts = quick_options(csv, results.clone());

    let err = pipeline::train::run(&opts, &extractor(), &AtomicBool::new(true)).unwrap_err();
    assert_eq!(
        err.downcast_ref::<TrainingError>(),
        Some(&TrainingError::Cancelled)
    );
    assert!(!results.join("model.json").exists());
}

#[test]
fn failed_report_write_keeps_the_previous_model() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_dataset(dir.path(), 60);
    let results = dir.path().join("results");
    let mut opts = quick_options(csv, results.clone());
    opts.params.n_trees = 4;
    let first = pipeline::train::run(&opts, &extractor(), &AtomicBool::new(false)).unwrap();

    // A directory where the metrics file should go makes the write fail
    std::fs::remove_file(&first.metrics_path).unwrap();
    std::fs::create_dir(&first.metrics_path).unwrap();
    opts.params.n_trees = 9;
    assert!(pipeline::train::run(&opts, &extractor(), &AtomicBool::new(false)).is_err());

    let kept = artifact::load(&results.join("model.json")).unwrap();
    assert_eq!(kept.model.n_trees(), 4);
}

#[test]
fn single_class_dataset_fails_training() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("humans.csv");
    let mut csv = String::from("Username,Tweet,Follower Count,Bot Label\n");
    for i in 0..20 {
        csv.push_str(&format!("user{i},hello,{},0\n", 100 + i));
    }
    std::fs::write(&path, csv).unwrap();

    let opts = quick_options(path, dir.path().join("results"));
    let err = pipeline::train::run(&opts, &extractor(), &AtomicBool::new(false)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TrainingError>(),
        Some(TrainingError::SingleClass { .. })
    ));
}
