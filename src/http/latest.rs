use crate::error::ApiError;
use crate::models::DeviceSummary;
use crate::state::AppState;
use axum::{Json, extract::State};

/// GET /latest_data
///
/// One row per device, ordered by device id. There is at most one state row
/// per device, so "latest" is simply the current table.
pub async fn latest_data(
    State(state): State<AppState>,
) -> Result<Json<Vec<DeviceSummary>>, ApiError> {
    let snapshot = state.store.latest_snapshot().await?;
    if snapshot.is_empty() {
        return Err(ApiError::NoData);
    }
    Ok(Json(snapshot))
}
