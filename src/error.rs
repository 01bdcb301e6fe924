//! Request-level error taxonomy and HTTP status mapping.

use crate::db::DbError;
use crate::http::response::json_error;
use crate::models::NeighborCountError;
use crate::relay::RelayError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete ingestion body, including a wrong
    /// neighbor-cell count.
    #[error("{0}")]
    InvalidPayload(String),
    /// Empty store on a query; a not-found condition, not a fault.
    #[error("no device data available")]
    NoData,
    /// Missing command field or a command kind outside the closed set.
    #[error("{0}")]
    InvalidCommand(String),
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}

impl From<NeighborCountError> for ApiError {
    fn from(e: NeighborCountError) -> Self {
        Self::InvalidPayload(e.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidPayload(_) | Self::InvalidCommand(_) => StatusCode::BAD_REQUEST,
            Self::NoData => StatusCode::NOT_FOUND,
            Self::Relay(_) | Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        json_error(self.status(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            ApiError::InvalidPayload("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NoData.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::InvalidCommand("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Relay(RelayError::Timeout("connect")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn relay_failures_keep_their_detail() {
        let err = ApiError::Relay(RelayError::Connect("refused".into()));
        assert_eq!(err.to_string(), "connect failed: refused");
    }
}
