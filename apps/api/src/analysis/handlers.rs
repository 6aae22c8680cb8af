//! Axum route handlers for the Analysis API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::analysis::contract::{run_analysis, AnalysisOutcome, FailureKind};
use crate::analysis::features::{Feature, COMPASS_MOODS, PLATFORMS, SEASONS};
use crate::analysis::schema::AnalysisRequest;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CompassOptionsResponse {
    pub seasons: &'static [&'static str],
    pub moods: &'static [&'static str],
    pub platforms: &'static [&'static str],
}

/// POST /api/v1/analysis/:feature
///
/// Runs one analysis. The body is always the discriminated outcome; the status
/// code tells input problems (400) apart from provider trouble (502).
pub async fn handle_run_analysis(
    State(state): State<AppState>,
    Path(feature_id): Path<String>,
    payload: Result<Json<AnalysisRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AnalysisOutcome>), AppError> {
    let feature = feature_id
        .parse::<Feature>()
        .map_err(|e| AppError::NotFound(e.to_string()))?;

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let outcome = AnalysisOutcome::invalid_body(rejection.body_text());
            return Ok((StatusCode::BAD_REQUEST, Json(outcome)));
        }
    };

    let outcome = run_analysis(state.provider.as_ref(), feature, &request).await;
    if !outcome.is_success() {
        tracing::debug!(
            feature = %feature,
            error = outcome.error().unwrap_or_default(),
            "Returning failed analysis outcome"
        );
    }
    Ok((status_for(&outcome), Json(outcome)))
}

/// GET /api/v1/content-compass/options
///
/// The preset choices the compass form offers.
pub async fn handle_compass_options() -> Json<CompassOptionsResponse> {
    Json(CompassOptionsResponse {
        seasons: SEASONS,
        moods: COMPASS_MOODS,
        platforms: PLATFORMS,
    })
}

fn status_for(outcome: &AnalysisOutcome) -> StatusCode {
    match outcome.failure_kind() {
        None => StatusCode::OK,
        Some(FailureKind::InvalidInput) => StatusCode::BAD_REQUEST,
        Some(FailureKind::Provider) | Some(FailureKind::SchemaViolation) => StatusCode::BAD_GATEWAY,
    }
}
