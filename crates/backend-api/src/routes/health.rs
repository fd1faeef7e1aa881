use axum::{extract::State, Json};
use serde::Serialize;
use supportdesk_database::time::now_timestamp;
use utoipa::ToSchema;

use crate::util::ApiResponse;
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub environment: String,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Service is up"))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    ApiResponse::ok(HealthResponse {
        status: "OK".to_string(),
        timestamp: now_timestamp(),
        environment: state.config().http.environment.clone(),
    })
}
