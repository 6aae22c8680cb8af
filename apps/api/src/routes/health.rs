use axum::Json;
use serde_json::{json, Value};

use crate::llm_client::{IMAGE_MODEL, TEXT_MODEL};

/// GET /health
/// Returns a simple status object with service version and the hardcoded models.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "moodframe-api",
        "models": {
            "text": TEXT_MODEL,
            "image": IMAGE_MODEL
        }
    }))
}
