use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use supportdesk_database::{
    Document, DocumentAnalytics, DocumentFilter, DocumentStatus, UpdateDocumentRequest,
};
use utoipa::{IntoParams, ToSchema};

use crate::services::document::{self as document_service, UploadMetadata, UploadedFile};
use crate::util::{
    non_empty, parse_page, split_tags, ApiResponse, ApiResult, JsonBody, Pagination, Validator,
};
use crate::{ApiError, AppState};

const SINGLE_FILE_FIELD: &str = "document";
const MULTIPLE_FILE_FIELD: &str = "documents";
const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 1000;
const MAX_CATEGORY_CHARS: usize = 100;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DocumentListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentList {
    pub documents: Vec<Document>,
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

/// Files and text fields read from one multipart body.
#[derive(Debug, Default)]
struct UploadForm {
    files: Vec<UploadedFile>,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
}

impl UploadForm {
    async fn read(
        mut multipart: Multipart,
        file_field: &str,
        max_files: usize,
    ) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            if let Some(file_name) = field.file_name().map(str::to_string) {
                if name != file_field {
                    return Err(ApiError::bad_request("Unexpected file field"));
                }
                if form.files.len() >= max_files {
                    return Err(ApiError::bad_request(format!(
                        "Too many files. Maximum is {max_files}"
                    )));
                }
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                form.files.push(UploadedFile {
                    original_name: file_name,
                    mime_type,
                    bytes,
                });
                continue;
            }

            let value = field.text().await?;
            match name.as_str() {
                "title" => form.title = Some(value),
                "description" => form.description = Some(value),
                "category" => form.category = Some(value),
                "tags" => form.tags = split_tags(&value),
                _ => {}
            }
        }

        Ok(form)
    }

    fn validate(&self) -> Result<(), ApiError> {
        let mut validator = Validator::default();
        validator.max_chars(
            "title",
            self.title.as_deref(),
            MAX_TITLE_CHARS,
            "Title cannot exceed 200 characters",
        );
        validator.max_chars(
            "description",
            self.description.as_deref(),
            MAX_DESCRIPTION_CHARS,
            "Description cannot exceed 1000 characters",
        );
        validator.max_chars(
            "category",
            self.category.as_deref(),
            MAX_CATEGORY_CHARS,
            "Category cannot exceed 100 characters",
        );
        validator.finish()
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    non_empty(value.as_deref()).map(str::to_string)
}

#[utoipa::path(
    post,
    path = "/api/documents/upload",
    tag = "Documents",
    security(("bearerAuth" = [])),
    responses(
        (status = 201, description = "Document stored, text extraction running in the background"),
        (status = 400, description = "Missing or unsupported file", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::error::ErrorResponse),
        (status = 413, description = "File size exceeds limit", body = crate::error::ErrorResponse)
    )
)]
pub async fn upload_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Document>>), ApiError> {
    let admin = state.require_admin(&headers).await?;
    let mut form = UploadForm::read(multipart, SINGLE_FILE_FIELD, 1).await?;
    form.validate()?;

    let Some(file) = form.files.pop() else {
        return Err(ApiError::bad_request("Please upload a file"));
    };

    let metadata = UploadMetadata {
        title: trimmed(form.title),
        description: trimmed(form.description),
        category: trimmed(form.category),
        tags: form.tags,
    };
    let document = document_service::upload(&state, file, metadata, &admin).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(
            document,
            "Document uploaded successfully. Processing in background.",
        ),
    ))
}

#[utoipa::path(
    post,
    path = "/api/documents/upload-multiple",
    tag = "Documents",
    security(("bearerAuth" = [])),
    responses(
        (status = 201, description = "Documents stored"),
        (status = 400, description = "Missing, unsupported or too many files", body = crate::error::ErrorResponse),
        (status = 413, description = "File size exceeds limit", body = crate::error::ErrorResponse)
    )
)]
pub async fn upload_multiple(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Vec<Document>>>), ApiError> {
    let admin = state.require_admin(&headers).await?;
    let max_files = state.config().uploads.max_files;
    let form = UploadForm::read(multipart, MULTIPLE_FILE_FIELD, max_files).await?;
    form.validate()?;

    if form.files.is_empty() {
        return Err(ApiError::bad_request("Please upload at least one file"));
    }

    let category = trimmed(form.category);
    let mut documents = Vec::with_capacity(form.files.len());
    for file in form.files {
        let metadata = UploadMetadata {
            title: Some(file.original_name.clone()),
            category: category.clone(),
            ..UploadMetadata::default()
        };
        documents.push(document_service::upload(&state, file, metadata, &admin).await?);
    }

    let message = format!("{} documents uploaded successfully", documents.len());
    Ok((StatusCode::CREATED, ApiResponse::with_message(documents, message)))
}

#[utoipa::path(
    get,
    path = "/api/documents",
    tag = "Documents",
    security(("bearerAuth" = [])),
    params(DocumentListQuery),
    responses(
        (status = 200, description = "Active documents without their text"),
        (status = 400, description = "Invalid query", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DocumentListQuery>,
) -> ApiResult<DocumentList> {
    state.require_admin(&headers).await?;
    let page = parse_page(query.page.as_deref(), query.limit.as_deref())?;

    let status = match non_empty(query.status.as_deref()) {
        Some(raw) => Some(raw.parse::<DocumentStatus>().map_err(|_| {
            ApiError::validation(vec![crate::error::FieldError::new(
                "status",
                "Invalid document status",
            )])
        })?),
        None => None,
    };

    let filter = DocumentFilter {
        category: trimmed(query.category),
        status,
        search: trimmed(query.search),
    };
    let (documents, total) = document_service::list(&state, &filter, page).await?;
    Ok(ApiResponse::ok(DocumentList {
        documents,
        pagination: Pagination::new(page, total),
    }))
}

#[utoipa::path(
    get,
    path = "/api/documents/{id}",
    tag = "Documents",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Document with extracted text"),
        (status = 404, description = "Document not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
) -> ApiResult<Document> {
    state.require_admin(&headers).await?;
    let document = document_service::get(&state, &document_id).await?;
    Ok(ApiResponse::ok(document))
}

#[utoipa::path(
    put,
    path = "/api/documents/{id}",
    tag = "Documents",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Document identifier")),
    request_body = DocumentUpdateRequest,
    responses(
        (status = 200, description = "Document updated"),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "Document not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
    JsonBody(payload): JsonBody<DocumentUpdateRequest>,
) -> ApiResult<Document> {
    let admin = state.require_admin(&headers).await?;

    let mut validator = Validator::default();
    validator.max_chars(
        "title",
        payload.title.as_deref(),
        MAX_TITLE_CHARS,
        "Title cannot exceed 200 characters",
    );
    validator.max_chars(
        "description",
        payload.description.as_deref(),
        MAX_DESCRIPTION_CHARS,
        "Description cannot exceed 1000 characters",
    );
    validator.finish()?;

    let request = UpdateDocumentRequest {
        title: trimmed(payload.title),
        description: payload.description,
        category: payload.category,
        tags: payload.tags,
        is_active: payload.is_active,
    };
    let document = document_service::update(&state, &document_id, &request, &admin).await?;
    Ok(ApiResponse::with_message(document, "Document updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    tag = "Documents",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Document deleted"),
        (status = 404, description = "Document not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
) -> ApiResult<()> {
    let admin = state.require_admin(&headers).await?;
    document_service::delete(&state, &document_id, &admin).await?;
    Ok(ApiResponse::message("Document deleted successfully"))
}

#[utoipa::path(
    get,
    path = "/api/documents/categories",
    tag = "Documents",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Distinct document categories"))
)]
pub async fn categories(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Vec<String>> {
    state.require_admin(&headers).await?;
    Ok(ApiResponse::ok(document_service::categories(&state).await?))
}

#[utoipa::path(
    post,
    path = "/api/documents/{id}/reprocess",
    tag = "Documents",
    security(("bearerAuth" = [])),
    params(("id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Reprocessing started"),
        (status = 400, description = "Document is not in failed state", body = crate::error::ErrorResponse),
        (status = 404, description = "Document not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn reprocess_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(document_id): Path<String>,
) -> ApiResult<()> {
    state.require_admin(&headers).await?;
    document_service::reprocess(&state, &document_id).await?;
    Ok(ApiResponse::message("Document reprocessing started"))
}

#[utoipa::path(
    get,
    path = "/api/documents/analytics",
    tag = "Documents",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Document counts and usage"))
)]
pub async fn analytics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<DocumentAnalytics> {
    state.require_admin(&headers).await?;
    Ok(ApiResponse::ok(document_service::analytics(&state).await?))
}
