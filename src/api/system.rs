use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use super::{ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub uptime_secs: u64,
    pub version: &'static str,
}

/// `GET /health`
///
/// Checks store connectivity. Sits behind the access policy like every other
/// non-public route.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let database = state.store.ping().await.is_ok();

    let (status_code, status) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status_code,
        Json(ApiResponse::success(HealthResponse {
            status,
            database,
            uptime_secs: state.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION"),
        })),
    )
        .into_response()
}
