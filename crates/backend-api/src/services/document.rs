use std::path::Path;

use bytes::Bytes;
use supportdesk_database::{
    CreateDocumentRequest, Document, DocumentAnalytics, DocumentFilter, DocumentStatus,
    DocumentType, PageRequest, TopDocument, UpdateDocumentRequest, User,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::ServiceError;
use super::extract::{extract_text, ExtractedText};
use crate::AppState;

pub const INVALID_TYPE_MESSAGE: &str = "Invalid file type. Allowed types: PDF, DOCX, TXT, MD";
pub const INVALID_EXTENSION_MESSAGE: &str = "Invalid file extension. Allowed: .pdf, .docx, .txt, .md";
pub const FILE_TOO_LARGE_MESSAGE: &str = "File size exceeds limit";

/// A file received from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Default)]
pub struct UploadMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

/// Check the declared mime type, then the extension. The extension decides
/// the stored file type.
pub fn validate_upload(file: &UploadedFile) -> Result<DocumentType, ServiceError> {
    if DocumentType::from_mime(&file.mime_type).is_none() {
        return Err(ServiceError::bad_request(INVALID_TYPE_MESSAGE));
    }
    DocumentType::from_file_name(&file.original_name)
        .ok_or_else(|| ServiceError::bad_request(INVALID_EXTENSION_MESSAGE))
}

/// Persist the file, create its record and start text extraction in the
/// background.
pub async fn upload(
    state: &AppState,
    file: UploadedFile,
    metadata: UploadMetadata,
    user: &User,
) -> Result<Document, ServiceError> {
    let file_type = validate_upload(&file)?;
    if file.bytes.len() as u64 > state.config().uploads.max_file_size_bytes {
        return Err(ServiceError::PayloadTooLarge(FILE_TOO_LARGE_MESSAGE.to_string()));
    }

    let directory = state.upload_dir();
    tokio::fs::create_dir_all(&directory).await?;
    let file_name = format!("{}.{}", Uuid::new_v4(), file_type.as_str());
    let file_path = directory.join(&file_name);
    tokio::fs::write(&file_path, &file.bytes).await?;

    let title = metadata
        .title
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| file.original_name.clone());

    let created = state
        .documents()
        .create(&CreateDocumentRequest {
            title,
            description: metadata.description,
            file_name,
            original_name: file.original_name,
            file_path: file_path.to_string_lossy().into_owned(),
            file_type,
            mime_type: file.mime_type,
            file_size: file.bytes.len() as i64,
            uploaded_by: user.id,
            category: metadata.category,
            tags: metadata.tags,
        })
        .await;

    let document = match created {
        Ok(document) => document,
        Err(err) => {
            if let Err(remove_err) = tokio::fs::remove_file(&file_path).await {
                warn!(path = %file_path.display(), error = %remove_err, "failed to remove orphaned upload");
            }
            return Err(err.into());
        }
    };

    info!(document_id = %document.public_id, user_id = %user.public_id, "document uploaded");
    spawn_processing(state.clone(), document.id);
    Ok(document)
}

pub fn spawn_processing(state: AppState, document_id: i64) {
    tokio::spawn(async move {
        if let Err(err) = process(&state, document_id).await {
            error!(document_id, error = %err, "document processing task failed");
        }
    });
}

/// Extract the text of a stored document and record the outcome. Extraction
/// failures are written to the record rather than returned.
pub async fn process(state: &AppState, document_id: i64) -> Result<Document, ServiceError> {
    let document = state
        .documents()
        .find_by_id(document_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Document not found"))?;

    match read_and_extract(Path::new(&document.file_path), document.file_type).await {
        Ok(extracted) => {
            state
                .documents()
                .mark_processed(
                    document_id,
                    &extracted.content,
                    extracted.page_count,
                    extracted.word_count,
                )
                .await?
        }
        Err(message) => state.documents().mark_failed(document_id, &message).await?,
    }

    state
        .documents()
        .find_by_id(document_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Document not found"))
}

async fn read_and_extract(path: &Path, file_type: DocumentType) -> Result<ExtractedText, String> {
    let bytes = tokio::fs::read(path).await.map_err(|e| e.to_string())?;
    tokio::task::spawn_blocking(move || extract_text(&bytes, file_type))
        .await
        .map_err(|e| e.to_string())?
        .map_err(|e| e.to_string())
}

pub async fn list(
    state: &AppState,
    filter: &DocumentFilter,
    page: PageRequest,
) -> Result<(Vec<Document>, i64), ServiceError> {
    Ok(state.documents().list(filter, page).await?)
}

pub async fn get(state: &AppState, document_id: &str) -> Result<Document, ServiceError> {
    state
        .documents()
        .find_by_public_id(document_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Document not found"))
}

pub async fn update(
    state: &AppState,
    document_id: &str,
    request: &UpdateDocumentRequest,
    user: &User,
) -> Result<Document, ServiceError> {
    let document = get(state, document_id).await?;
    let updated = state.documents().update_metadata(document.id, request).await?;
    info!(document_id = %document_id, user_id = %user.public_id, "document updated");
    Ok(updated)
}

/// Remove the stored file and hide the record.
pub async fn delete(state: &AppState, document_id: &str, user: &User) -> Result<(), ServiceError> {
    let document = get(state, document_id).await?;

    if let Err(err) = tokio::fs::remove_file(&document.file_path).await {
        warn!(path = %document.file_path, error = %err, "failed to delete document file");
    }

    state.documents().soft_delete(document.id).await?;
    info!(document_id = %document_id, user_id = %user.public_id, "document deleted");
    Ok(())
}

pub async fn categories(state: &AppState) -> Result<Vec<String>, ServiceError> {
    Ok(state.documents().categories().await?)
}

pub async fn reprocess(state: &AppState, document_id: &str) -> Result<(), ServiceError> {
    let document = get(state, document_id).await?;
    if document.status != DocumentStatus::Failed {
        return Err(ServiceError::bad_request("Document is not in failed state"));
    }

    state.documents().mark_processing(document.id).await?;
    spawn_processing(state.clone(), document.id);
    info!(document_id = %document_id, "document reprocessing started");
    Ok(())
}

pub async fn analytics(state: &AppState) -> Result<DocumentAnalytics, ServiceError> {
    Ok(state.documents().analytics().await?)
}

pub async fn top_documents(state: &AppState, limit: i64) -> Result<Vec<TopDocument>, ServiceError> {
    Ok(state.documents().top_documents(limit).await?)
}
