// POST /predict: score one raw record.
//
// The body is read as raw bytes and parsed here rather than through the Json
// extractor, so every malformed body (bad JSON, wrong content type, an array
// instead of an object) gets the same 400 {"error": ...} shape.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::debug;

use crate::features::RawRecord;
use crate::web::{api_error, AppState};

pub async fn predict(State(state): State<AppState>, body: Bytes) -> Response {
    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return api_error(
                StatusCode::BAD_REQUEST,
                &format!("Request body must be JSON: {e}"),
            )
        }
    };
    let Some(record) = RawRecord::from_json(value) else {
        return api_error(
            StatusCode::BAD_REQUEST,
            "Request body must be a JSON object",
        );
    };

    let result = state.service.predict(&record);
    debug!(
        bot = result.is_bot,
        probability = result.probability,
        "Scored request"
    );

    Json(serde_json::json!({
        "bot": result.is_bot,
        "probability": result.probability,
        "schema_version": result.schema_version,
    }))
    .into_response()
}
