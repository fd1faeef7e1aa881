use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use supportdesk_database::Chat;
use utoipa::{IntoParams, ToSchema};

use crate::services::chat::{self as chat_service, ChatDetail, SendMessageResult};
use crate::util::{non_empty, parse_page, ApiResponse, ApiResult, JsonBody, Pagination, Validator};
use crate::{ApiError, AppState};

pub const MAX_MESSAGE_CHARS: usize = 10_000;

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub message: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FeedbackRequest {
    pub helpful: Option<bool>,
    #[serde(alias = "feedbackText")]
    pub feedback: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatHistory {
    pub chats: Vec<Chat>,
    pub pagination: Pagination,
}

#[utoipa::path(
    post,
    path = "/api/chat/message",
    tag = "Chat",
    security(("bearerAuth" = [])),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "User message stored with the assistant reply"),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "Chat not found", body = crate::error::ErrorResponse),
        (status = 429, description = "Too many messages", body = crate::error::ErrorResponse)
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<SendMessageRequest>,
) -> ApiResult<SendMessageResult> {
    let user = state.authenticate(&headers).await?;

    let mut validator = Validator::default();
    validator.required("message", payload.message.as_deref(), "Message is required");
    validator.max_chars(
        "message",
        payload.message.as_deref(),
        MAX_MESSAGE_CHARS,
        "Message cannot exceed 10000 characters",
    );
    validator.finish()?;

    let message = payload.message.as_deref().map(str::trim).unwrap_or_default();
    let chat_id = non_empty(payload.chat_id.as_deref());
    let result = chat_service::send_message(&state, &user, message, chat_id).await?;
    Ok(ApiResponse::ok(result))
}

#[utoipa::path(
    post,
    path = "/api/chat/new",
    tag = "Chat",
    security(("bearerAuth" = [])),
    responses(
        (status = 201, description = "Empty chat created"),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<ApiResponse<Chat>>), ApiError> {
    let user = state.authenticate(&headers).await?;
    let chat = chat_service::create_or_get_chat(&state, &user, None).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(chat)))
}

#[utoipa::path(
    get,
    path = "/api/chat/history",
    tag = "Chat",
    security(("bearerAuth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "The caller's chats, most recent first"),
        (status = 400, description = "Invalid pagination", body = crate::error::ErrorResponse)
    )
)]
pub async fn chat_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> ApiResult<ChatHistory> {
    let user = state.authenticate(&headers).await?;
    let page = parse_page(query.page.as_deref(), query.limit.as_deref())?;
    let (chats, total) = chat_service::chat_history(&state, &user, page).await?;
    Ok(ApiResponse::ok(ChatHistory {
        chats,
        pagination: Pagination::new(page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/api/chat/{chatId}",
    tag = "Chat",
    security(("bearerAuth" = [])),
    params(("chatId" = String, Path, description = "Chat identifier")),
    responses(
        (status = 200, description = "Chat with its messages"),
        (status = 404, description = "Chat not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
) -> ApiResult<ChatDetail> {
    let user = state.authenticate(&headers).await?;
    let detail = chat_service::chat_by_id(&state, &chat_id, Some(&user)).await?;
    Ok(ApiResponse::ok(detail))
}

#[utoipa::path(
    delete,
    path = "/api/chat/{chatId}",
    tag = "Chat",
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
    let user = state.authenticate(&headers).await?;
    chat_service::delete_chat(&state, &chat_id, &user, false).await?;
    Ok(ApiResponse::message("Chat deleted successfully"))
}

#[utoipa::path(
    post,
    path = "/api/chat/feedback/{messageId}",
    tag = "Chat",
    security(("bearerAuth" = [])),
    params(("messageId" = String, Path, description = "Message identifier")),
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Feedback stored"),
        (status = 403, description = "Message belongs to another user", body = crate::error::ErrorResponse),
        (status = 404, description = "Message not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn message_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<String>,
    JsonBody(payload): JsonBody<FeedbackRequest>,
) -> ApiResult<()> {
    let user = state.authenticate(&headers).await?;

    let Some(helpful) = payload.helpful else {
        return Err(ApiError::validation(vec![crate::error::FieldError::new(
            "helpful",
            "Helpful must be a boolean",
        )]));
    };

    chat_service::add_message_feedback(
        &state,
        &message_id,
        &user,
        helpful,
        non_empty(payload.feedback.as_deref()),
    )
    .await?;
    Ok(ApiResponse::message("Feedback recorded successfully"))
}
