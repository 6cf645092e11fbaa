use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Reports the session phase without waiting behind an in-flight interaction.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let mut body = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resume-search",
        "phase": "busy",
    });

    if let Ok(session) = state.session.try_lock() {
        body["phase"] = json!(session.phase());
        body["store_ready"] = json!(session.store_ready());
        body["entries"] = json!(session.store().map(|s| s.len()).unwrap_or(0));
    }

    Json(body)
}
