use axum::{
    extract::{rejection::QueryRejection, Query},
    Json,
};
use serde::Deserialize;

use crate::cadence::{recommend, CadenceError, Mood, Recommendation};
use crate::errors::AppError;

#[derive(Debug, Deserialize)]
pub struct CadenceQuery {
    pub mood: String,
    pub energy: i64,
}

impl From<CadenceError> for AppError {
    fn from(err: CadenceError) -> Self {
        match err {
            CadenceError::InvalidInput(msg) => AppError::Validation(msg),
        }
    }
}

/// GET /api/v1/cadence?mood=tired&energy=70
pub async fn handle_cadence(
    query: Result<Query<CadenceQuery>, QueryRejection>,
) -> Result<Json<Recommendation>, AppError> {
    let Query(query) = query.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let mood: Mood = query.mood.parse()?;
    let recommendation = recommend(mood, query.energy)?;
    tracing::debug!(
        mood = %recommendation.mood,
        energy = query.energy,
        level = ?recommendation.energy_level,
        "Cadence recommendation resolved"
    );
    Ok(Json(recommendation))
}
