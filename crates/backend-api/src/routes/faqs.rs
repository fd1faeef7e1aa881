use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use supportdesk_database::{Faq, FaqAnalytics, FaqFilter, PublicFaq};
use utoipa::{IntoParams, ToSchema};

use crate::error::FieldError;
use crate::services::faq::{self as faq_service, FaqInput, FaqUpdate, ImportReport};
use crate::util::{non_empty, parse_page, ApiResponse, ApiResult, JsonBody, Pagination};
use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct FaqListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FaqList {
    pub faqs: Vec<Faq>,
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaqFeedbackRequest {
    pub is_useful: Option<bool>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BulkImportRequest {
    pub faqs: Option<Vec<FaqInput>>,
}

#[utoipa::path(
    get,
    path = "/api/faqs",
    tag = "FAQs",
    params(CategoryQuery),
    responses((status = 200, description = "Public FAQs by priority then views"))
)]
pub async fn public_faqs(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> ApiResult<Vec<PublicFaq>> {
    let faqs = faq_service::public(&state, non_empty(query.category.as_deref())).await?;
    Ok(ApiResponse::ok(faqs))
}

#[utoipa::path(
    get,
    path = "/api/faqs/categories",
    tag = "FAQs",
    responses((status = 200, description = "Distinct FAQ categories"))
)]
pub async fn categories(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    Ok(ApiResponse::ok(faq_service::categories(&state).await?))
}

#[utoipa::path(
    get,
    path = "/api/faqs/{id}",
    tag = "FAQs",
    params(("id" = String, Path, description = "FAQ identifier")),
    responses(
        (status = 200, description = "FAQ, counted as a view"),
        (status = 404, description = "FAQ not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_faq(State(state): State<AppState>, Path(faq_id): Path<String>) -> ApiResult<Faq> {
    Ok(ApiResponse::ok(faq_service::get(&state, &faq_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/faqs/{id}/feedback",
    tag = "FAQs",
    params(("id" = String, Path, description = "FAQ identifier")),
    request_body = FaqFeedbackRequest,
    responses(
        (status = 200, description = "Feedback counted"),
        (status = 404, description = "FAQ not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn feedback(
    State(state): State<AppState>,
    Path(faq_id): Path<String>,
    JsonBody(payload): JsonBody<FaqFeedbackRequest>,
) -> ApiResult<()> {
    let Some(is_useful) = payload.is_useful else {
        return Err(ApiError::validation(vec![FieldError::new(
            "isUseful",
            "isUseful must be a boolean",
        )]));
    };
    faq_service::add_feedback(&state, &faq_id, is_useful).await?;
    Ok(ApiResponse::message("Thank you for your feedback"))
}

#[utoipa::path(
    get,
    path = "/api/faqs/admin/all",
    tag = "FAQs",
    security(("bearerAuth" = [])),
    params(FaqListQuery),
    responses(
        (status = 200, description = "All active FAQs, public or not"),
        (status = 403, description = "Admin role required", body = crate::error::ErrorResponse)
    )
)]
pub async fn all_faqs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<FaqListQuery>,
) -> ApiResult<FaqList> {
    state.require_admin(&headers).await?;
    let page = parse_page(query.page.as_deref(), query.limit.as_deref())?;
    let filter = FaqFilter {
        category: non_empty(query.category.as_deref()).map(str::to_string),
        search: non_empty(query.search.as_deref()).map(str::to_string),
        is_public: None,
    };
    let (faqs, total) = faq_service::list(&state, &filter, page).await?;
    Ok(ApiResponse::ok(FaqList {
        faqs,
        pagination: Pagination::new(page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/api/faqs/admin/analytics",
    tag = "FAQs",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "FAQ counts, top viewed and feedback totals"))
)]
pub async fn analytics(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<FaqAnalytics> {
    state.require_admin(&headers).await?;
    Ok(ApiResponse::ok(faq_service::analytics(&state).await?))
}

#[utoipa::path(
    post,
    path = "/api/faqs",
    tag = "FAQs",
    security(("bearerAuth" = [])),
    request_body = FaqInput,
    responses(
        (status = 201, description = "FAQ created"),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_faq(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<FaqInput>,
) -> Result<(StatusCode, Json<ApiResponse<Faq>>), ApiError> {
    let admin = state.require_admin(&headers).await?;
    let faq = faq_service::create(&state, payload, &admin).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(faq, "FAQ created successfully"),
    ))
}

#[utoipa::path(
    post,
    path = "/api/faqs/bulk-import",
    tag = "FAQs",
    security(("bearerAuth" = [])),
    request_body = BulkImportRequest,
    responses(
        (status = 200, description = "Per-item import results"),
        (status = 400, description = "No FAQs given", body = crate::error::ErrorResponse)
    )
)]
pub async fn bulk_import(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<BulkImportRequest>,
) -> ApiResult<ImportReport> {
    let admin = state.require_admin(&headers).await?;
    let report = faq_service::bulk_import(&state, payload.faqs.unwrap_or_default(), &admin).await?;
    let message = format!(
        "Import completed: {} successful, {} failed",
        report.success, report.failed
    );
    Ok(ApiResponse::with_message(report, message))
}

#[utoipa::path(
    put,
    path = "/api/faqs/{id}",
    tag = "FAQs",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "FAQ identifier")),
    request_body = FaqUpdate,
    responses(
        (status = 200, description = "FAQ updated"),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "FAQ not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_faq(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(faq_id): Path<String>,
    JsonBody(payload): JsonBody<FaqUpdate>,
) -> ApiResult<Faq> {
    let admin = state.require_admin(&headers).await?;
    let faq = faq_service::update(&state, &faq_id, payload, &admin).await?;
    Ok(ApiResponse::with_message(faq, "FAQ updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/api/faqs/{id}",
    tag = "FAQs",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "FAQ identifier")),
    responses(
        (status = 200, description = "FAQ deactivated"),
        (status = 404, description = "FAQ not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_faq(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(faq_id): Path<String>,
) -> ApiResult<()> {
    let admin = state.require_admin(&headers).await?;
    faq_service::delete(&state, &faq_id, &admin).await?;
    Ok(ApiResponse::message("FAQ deleted successfully"))
}
