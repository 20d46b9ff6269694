use axum::{extract::State, response::Json};
use serde_json::json;

use crate::server::AppState;

/// Health check endpoint handler.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/ping`
///
/// # Response Format
/// ```json
/// {
///   "status": "pong",
///   "session_cache": "redis",
///   "credential_store": "postgres"
/// }
/// ```
///
/// `session_cache` names the active session backend (`redis`, `memory` or
/// `disabled`). The server stays healthy with the cache disabled, since
/// authentication never depends on it. `credential_store` is `postgres` or
/// `memory`.
pub async fn ping(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "pong",
        "session_cache": state.auth.sessions().backend(),
        "credential_store": state.auth.credential_backend(),
    }))
}
