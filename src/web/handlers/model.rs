// GET /model and POST /reload: inspect and hot-swap the served artifact.
//
// Reload returns 200 with the new schema version on success. On failure the
// previous model keeps serving and the status says why:
//   409 Conflict             schema mismatch (retrain needed)
//   503 Service Unavailable  file missing, unreadable or corrupt

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::web::{api_error, AppState};

pub async fn get_model(State(state): State<AppState>) -> impl IntoResponse {
    let loaded = state.service.current();
    let artifact = &loaded.artifact;
    Json(serde_json::json!({
        "state": loaded.state,
        "schema": artifact.schema,
        "layout_hash": format!("{:08x}", artifact.schema.layout_hash()),
        "trees": artifact.model.n_trees(),
        "metadata": artifact.metadata,
    }))
}

pub async fn reload(State(state): State<AppState>) -> Response {
    let service = state.service.clone();
    let path = state.model_path.clone();
    let result = tokio::task::spawn_blocking(move || service.reload(&path)).await;

    match result {
        Ok(Ok(())) => {
            let loaded = state.service.current();
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "message": "Model reloaded",
                    "schema_version": loaded.artifact.schema.version,
                })),
            )
                .into_response()
        }
        Ok(Err(e)) => {
            let status = if e.needs_retraining() {
                StatusCode::CONFLICT
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            api_error(status, &e.to_string())
        }
        Err(e) => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("Reload task failed: {e}"),
        ),
    }
}
