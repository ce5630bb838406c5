// Web server: Axum HTTP transport around the prediction service.
//
// Routes:
//   POST /predict  score one record
//   GET  /health   liveness plus model state
//   GET  /model    schema and training metadata of the loaded artifact
//   POST /reload   re-read the artifact from disk and hot-swap it
//
// The service is built once before the server starts and handed in through
// AppState; no handler ever loads a model on its own.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::service::PredictionService;

pub mod handlers;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    /// Where POST /reload reads the artifact from.
    pub model_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(service: PredictionService, model_path: PathBuf) -> Self {
        Self {
            service: Arc::new(service),
            model_path: Arc::new(model_path),
        }
    }
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(state: AppState, port: u16, bind: &str) -> Result<()> {
    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("botwatch prediction API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(handlers::predict::predict))
        .route("/health", get(health))
        .route("/model", get(handlers::model::get_model))
        .route("/reload", post(handlers::model::reload))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check: 200 OK with the lifecycle state of the loaded model.
async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let loaded = state.service.current();
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok", "state": loaded.state })),
    )
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
