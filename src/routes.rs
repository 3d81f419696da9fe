use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{error::AppError, state::AppState, SERVICE_NAME};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub environment: String,
    pub uptime_seconds: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

pub fn status_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api", get(api_index))
}

pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: format!("{SERVICE_NAME} is running"),
        version: None,
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        environment: state.config.environment.to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        timestamp: OffsetDateTime::now_utc(),
    })
}

pub async fn api_index() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "API is running".into(),
        version: Some(env!("CARGO_PKG_VERSION")),
    })
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}
