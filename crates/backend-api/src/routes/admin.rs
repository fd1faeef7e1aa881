use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use supportdesk_database::{ChatFilter, ChatStatus, ChatWithOwner, User, UserFilter, UserRole};
use utoipa::{IntoParams, ToSchema};

use crate::error::FieldError;
use crate::services::admin::{self as admin_service, Dashboard, SystemHealth};
use crate::services::chat::{self as chat_service, ChatDetail};
use crate::services::user::{self as user_service, UserUpdate};
use crate::util::{non_empty, parse_bool, parse_page, ApiResponse, ApiResult, JsonBody, Pagination};
use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AdminChatQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub user_id: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub role: Option<String>,
    pub search: Option<String>,
    pub is_active: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatList {
    pub chats: Vec<ChatWithOwner>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RoleUpdateRequest {
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub is_active: Option<bool>,
}

fn invalid(field: &str, message: &str) -> ApiError {
    ApiError::validation(vec![FieldError::new(field, message)])
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    tag = "Admin",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Overview counters with per-area analytics"),
        (status = 403, description = "Admin role required", body = crate::error::ErrorResponse)
    )
)]
pub async fn dashboard(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Dashboard> {
    state.require_admin(&headers).await?;
    Ok(ApiResponse::ok(admin_service::dashboard(&state).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/chats",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(AdminChatQuery),
    responses((status = 200, description = "Chats of every user with their owners"))
)]
pub async fn list_chats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AdminChatQuery>,
) -> ApiResult<ChatList> {
    state.require_admin(&headers).await?;
    let page = parse_page(query.page.as_deref(), query.limit.as_deref())?;

    let status = match non_empty(query.status.as_deref()) {
        Some(raw) => Some(
            raw.parse::<ChatStatus>()
                .map_err(|_| invalid("status", "Invalid chat status"))?,
        ),
        None => None,
    };
    let filter = ChatFilter {
        user_id: non_empty(query.user_id.as_deref()).map(str::to_string),
        status,
        search: non_empty(query.search.as_deref()).map(str::to_string),
    };

    let (chats, total) = chat_service::all_chats(&state, &filter, page).await?;
    Ok(ApiResponse::ok(ChatList {
        chats,
        pagination: Pagination::new(page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/chats/{chatId}",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(("chatId" = String, Path, description = "Chat identifier")),
    responses(
        (status = 200, description = "Any chat with its messages"),
        (status = 404, description = "Chat not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
) -> ApiResult<ChatDetail> {
    state.require_admin(&headers).await?;
    Ok(ApiResponse::ok(chat_service::chat_by_id(&state, &chat_id, None).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/chats/{chatId}",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(("chatId" = String, Path, description = "Chat identifier")),
    responses(
        (status = 200, description = "Chat deleted"),
        (status = 404, description = "Chat not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
) -> ApiResult<()> {
    let admin = state.require_admin(&headers).await?;
    chat_service::delete_chat(&state, &chat_id, &admin, true).await?;
    Ok(ApiResponse::message("Chat deleted successfully"))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(AdminUserQuery),
    responses((status = 200, description = "Accounts, newest first"))
)]
pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AdminUserQuery>,
) -> ApiResult<UserList> {
    state.require_admin(&headers).await?;
    let page = parse_page(query.page.as_deref(), query.limit.as_deref())?;

    let role = match non_empty(query.role.as_deref()) {
        Some(raw) => Some(
            raw.parse::<UserRole>()
                .map_err(|_| invalid("role", "Invalid role specified"))?,
        ),
        None => None,
    };
    let filter = UserFilter {
        role,
        is_active: parse_bool(query.is_active.as_deref()),
        search: non_empty(query.search.as_deref()).map(str::to_string),
    };

    let (users, total) = user_service::list(&state, &filter, page).await?;
    Ok(ApiResponse::ok(UserList {
        users,
        pagination: Pagination::new(page, total),
    }))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "User identifier")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "User updated"),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    JsonBody(payload): JsonBody<UserUpdate>,
) -> ApiResult<User> {
    let admin = state.require_admin(&headers).await?;
    let user = user_service::update(&state, &user_id, payload, &admin).await?;
    Ok(ApiResponse::with_message(user, "User updated successfully"))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "User identifier")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Role changed"),
        (status = 400, description = "Invalid role", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    JsonBody(payload): JsonBody<RoleUpdateRequest>,
) -> ApiResult<User> {
    let admin = state.require_admin(&headers).await?;
    let Some(role) = non_empty(payload.role.as_deref()).map(str::to_string) else {
        return Err(invalid("role", "Invalid role specified"));
    };

    let update = UserUpdate {
        role: Some(role),
        ..UserUpdate::default()
    };
    let user = user_service::update(&state, &user_id, update, &admin).await?;
    Ok(ApiResponse::with_message(user, "User role updated successfully"))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/status",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "User identifier")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Account activated or deactivated"),
        (status = 400, description = "isActive missing", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_user_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    JsonBody(payload): JsonBody<StatusUpdateRequest>,
) -> ApiResult<User> {
    let admin = state.require_admin(&headers).await?;
    let Some(is_active) = payload.is_active else {
        return Err(invalid("isActive", "isActive must be a boolean"));
    };

    let update = UserUpdate {
        is_active: Some(is_active),
        ..UserUpdate::default()
    };
    let user = user_service::update(&state, &user_id, update, &admin).await?;
    let message = if is_active {
        "User activated successfully"
    } else {
        "User deactivated successfully"
    };
    Ok(ApiResponse::with_message(user, message))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "Admin",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "User deactivated"),
        (status = 403, description = "Super admins cannot be deleted", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<()> {
    let admin = state.require_admin(&headers).await?;
    user_service::delete(&state, &user_id, &admin).await?;
    Ok(ApiResponse::message("User deactivated successfully"))
}

#[utoipa::path(
    get,
    path = "/api/admin/system/health",
    tag = "Admin",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Process uptime, memory and build details"))
)]
pub async fn system_health(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<SystemHealth> {
    state.require_admin(&headers).await?;
    Ok(ApiResponse::ok(admin_service::system_health(&state).await))
}
