pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod http;
pub mod models;
pub mod relay;
pub mod state;
pub mod store;

pub use db::{Db, DbError, DbResult};
pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/receive_data", post(http::ingest::receive_data))
        .route("/latest_data", get(http::latest::latest_data))
        .route("/send_command", post(http::command::send_command))
        .route("/events", get(http::sse::telemetry_sse))
        .route("/healthz", get(health::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

mod health {
    use axum::response::IntoResponse;
    pub async fn healthz() -> impl IntoResponse {
        "ok"
    }
}
