use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::Deserialize;
use supportdesk_database::{User, UserSummary};
use utoipa::IntoParams;

use crate::services::user as user_service;
use crate::util::{ApiResponse, ApiResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct UserSearchQuery {
    pub q: Option<String>,
    pub limit: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/users/search",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(UserSearchQuery),
    responses(
        (status = 200, description = "Active users matching email or name"),
        (status = 400, description = "Search query is required", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UserSearchQuery>,
) -> ApiResult<Vec<UserSummary>> {
    state.authenticate(&headers).await?;
    let limit = query.limit.as_deref().and_then(|raw| raw.trim().parse().ok());
    let users = user_service::search(&state, query.q.as_deref().unwrap_or_default(), limit).await?;
    Ok(ApiResponse::ok(users))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "User profile"),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<User> {
    state.authenticate(&headers).await?;
    Ok(ApiResponse::ok(user_service::get(&state, &user_id).await?))
}
