use crate::error::ApiError;
use crate::relay::{self, CommandKind};
use crate::state::AppState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub device_id: Option<String>,
    pub command_type: Option<String>,
}

/// POST /send_command
///
/// Field and kind checks happen before any network activity; a rejected
/// request opens zero downstream connections.
pub async fn send_command(
    State(state): State<AppState>,
    payload: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::InvalidCommand(e.body_text()))?;
    let device_id = body
        .device_id
        .ok_or_else(|| ApiError::InvalidCommand("device_id is required".to_owned()))?;
    let command_type = body
        .command_type
        .ok_or_else(|| ApiError::InvalidCommand("command_type is required".to_owned()))?;
    let kind = CommandKind::parse(&command_type)
        .ok_or_else(|| ApiError::InvalidCommand(format!("unknown command type: {command_type}")))?;

    let reply = relay::send_command(&state.relay, &device_id, kind)
        .await
        .inspect_err(|e| warn!(%device_id, error = %e, "command relay failed"))?;

    Ok(Json(json!({
        "status": "success",
        "command_sent": reply.command_sent,
        "response": reply.response,
    })))
}
