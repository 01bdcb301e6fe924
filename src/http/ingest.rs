use crate::error::ApiError;
use crate::models::TelemetryReport;
use crate::state::AppState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde_json::{Value, json};
use tracing::debug;

/// POST /receive_data
///
/// Validate, commit, then fan out. The publish happens only after the commit
/// succeeds and is deliberately not transactional with it: a crash in between
/// loses one live notification, never stored state.
pub async fn receive_data(
    State(state): State<AppState>,
    payload: Result<Json<TelemetryReport>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(report) = payload.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;
    report.validate()?;

    state.store.upsert(&report).await?;
    debug!(device_id = %report.device_id, msg = report.message_number, "report accepted");

    state.bus.publish(report);
    Ok(Json(json!({"status": "success"})))
}
