use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    state::AppState,
    telemetry::{
        dto::{RangeQuery, ReadingBody},
        repo::Reading,
    },
};

pub fn iot_routes() -> Router<AppState> {
    Router::new()
        .route("/iot", get(query_readings).post(ingest))
        .route("/iot/latest/:device_id", get(latest_reading))
}

#[instrument(skip(state, readings))]
pub async fn ingest(
    State(state): State<AppState>,
    AuthUser(_subject): AuthUser,
    Json(readings): Json<Vec<ReadingBody>>,
) -> Result<String, ApiError> {
    if readings.is_empty() {
        return Err(ApiError::InvalidInput("Invalid or empty list."));
    }

    let inserted = state.telemetry.insert_many(&readings).await?;
    info!(count = inserted, "readings ingested");
    Ok(format!("Inserted {inserted} records"))
}

#[instrument(skip(state))]
pub async fn latest_reading(
    State(state): State<AppState>,
    AuthUser(_subject): AuthUser,
    Path(device_id): Path<String>,
) -> Result<Json<Reading>, ApiError> {
    let reading = state
        .telemetry
        .latest_for_device(&device_id)
        .await?
        .ok_or(ApiError::NotFound("No matching records."))?;
    Ok(Json(reading))
}

#[instrument(skip(state))]
pub async fn query_readings(
    State(state): State<AppState>,
    AuthUser(_subject): AuthUser,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    let readings = state
        .telemetry
        .query_range(
            params.device_filter(),
            params.start_timestamp,
            params.end_timestamp,
        )
        .await?;

    // Empty results answer 404, matching the latest-reading lookup.
    if readings.is_empty() {
        return Err(ApiError::NotFound("No matching records."));
    }
    Ok(Json(readings))
}
