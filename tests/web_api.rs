// HTTP API tests: drive the router in-process with tower's oneshot.

#![cfg(feature = "web")]

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use botwatch::artifact::{self, ModelArtifact, TrainingMetadata};
use botwatch::dataset::prepare;
use botwatch::features::{FeatureExtractor, NeutralScorer, RawRecord};
use botwatch::model::{ForestParams, RandomForest};
use botwatch::service::PredictionService;
use botwatch::web::{build_router, AppState};

fn extractor() -> FeatureExtractor {
    FeatureExtractor::new(Arc::new(NeutralScorer))
}

fn trained_artifact(n_trees: usize) -> ModelArtifact {
    let records: Vec<RawRecord> = (0..40)
        .map(|i| {
            let bot = i % 2 == 0;
            RawRecord::from_json(json!({
                "Username": if bot { format!("bot{i:04}") } else { format!("person{}", ["a", "b", "c"][i % 3]) },
                "Tweet": if bot { "CLICK NOW!!! http://x.example" } else { "lunch was nice" },
                "Retweet Count": if bot { 90 } else { i % 4 },
                "Follower Count": if bot { 2 } else { 300 + i },
                "Bot Label": bot,
            }))
            .unwrap()
        })
        .collect();
    let (dataset, _) = prepare(&extractor(), &records, false);
    let params = ForestParams {
        n_trees,
        ..ForestParams::default()
    };
    let model = RandomForest::fit(&dataset.rows(), &dataset.labels(), &params).unwrap();
    let metadata = TrainingMetadata {
        trained_at: chrono::Utc::now(),
        train_rows: dataset.len(),
        test_rows: 0,
        test_fraction: 0.2,
        aggregated_by_entity: false,
        n_trees,
        max_depth: None,
        seed: 42,
        fit_seconds: 0.0,
        grid_search: None,
        test_accuracy: None,
        sentiment: "neutral".to_string(),
        crate_version: env!("CARGO_PKG_VERSION").to_string(),
    };
    ModelArtifact::new(dataset.schema.clone(), metadata, model)
}

fn state_at(path: &Path, n_trees: usize) -> AppState {
    artifact::save(&trained_artifact(n_trees), path).unwrap();
    let service = PredictionService::load(path, extractor()).unwrap();
    AppState::new(service, path.to_path_buf())
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = build_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================
// POST /predict
// ============================================================

#[tokio::test]
async fn predict_returns_label_and_probability() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_at(&dir.path().join("model.json"), 10);

    let body = json!({
        "username": "bot9999",
        "tweet": "CLICK NOW!!! http://x.example",
        "retweet_count": 90,
        "follower_count": 2,
    });
    let (status, json) = send(state, post("/predict", body.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["bot"], Value::Bool(true));
    let p = json["probability"].as_f64().unwrap();
    assert!(p > 0.5 && p <= 1.0);
    assert_eq!(json["schema_version"], 2);
}

#[tokio::test]
async fn empty_object_is_scored_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_at(&dir.path().join("model.json"), 5);

    let (status, json) = send(state, post("/predict", "{}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["bot"].is_boolean());
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_at(&dir.path().join("model.json"), 3);

    for body in ["{ nope", "[1, 2, 3]", "\"just a string\"", ""] {
        let (status, json) = send(state.clone(), post("/predict", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
        assert!(json["error"].is_string());
    }
}

// ============================================================
// GET /health, GET /model
// ============================================================

#[tokio::test]
async fn health_reports_serving_state() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_at(&dir.path().join("model.json"), 3);

    let (status, json) = send(state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["state"], "Serving");
}

#[tokio::test]
async fn model_endpoint_describes_the_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_at(&dir.path().join("model.json"), 4);

    let (status, json) = send(state, get("/model")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["trees"], 4);
    assert_eq!(json["schema"]["version"], 2);
    assert_eq!(json["schema"]["names"].as_array().unwrap().len(), 20);
    assert_eq!(json["metadata"]["sentiment"], "neutral");
}

// ============================================================
// POST /reload
// ============================================================

#[tokio::test]
async fn reload_swaps_in_the_new_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let state = state_at(&path, 3);

    artifact::save(&trained_artifact(7), &path).unwrap();
    let (status, _) = send(state.clone(), post("/reload", Body::empty())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.service.current().artifact.model.n_trees(), 7);
}

#[tokio::test]
async fn reload_of_mismatched_schema_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let state = state_at(&path, 3);

    let mut stale = trained_artifact(5);
    stale.schema.names.swap(0, 1);
    artifact::save(&stale, &path).unwrap();

    let (status, json) = send(state.clone(), post("/reload", Body::empty())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].is_string());
    assert_eq!(state.service.current().artifact.model.n_trees(), 3);
}

#[tokio::test]
async fn reload_of_missing_file_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    let state = state_at(&path, 3);

    std::fs::remove_file(&path).unwrap();
    let (status, _) = send(state.clone(), post("/reload", Body::empty())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(state.service.current().artifact.model.n_trees(), 3);
}
