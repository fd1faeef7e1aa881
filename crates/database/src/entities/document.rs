//! Document entity definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::types::CategoryCount;

pub const DEFAULT_CATEGORY: &str = "General";

/// An uploaded knowledge-base file and its extracted text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(skip_serializing)]
    pub id: i64,
    #[serde(rename = "id")]
    pub public_id: String,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub original_name: String,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub file_type: DocumentType,
    pub mime_type: String,
    pub file_size: i64,
    pub status: DocumentStatus,
    /// Raw extracted text. Listings leave it out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub metadata: DocumentMetadata,
    pub processing: DocumentProcessing,
    #[serde(skip_serializing)]
    pub uploaded_by: i64,
    #[serde(rename = "uploadedBy")]
    pub uploaded_by_public_id: String,
    pub is_active: bool,
    pub category: String,
    pub tags: Vec<String>,
    pub usage_count: i64,
    pub last_used_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub page_count: Option<i64>,
    pub word_count: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentProcessing {
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error: Option<String>,
    pub retry_count: i64,
}

impl<'r> FromRow<'r, SqliteRow> for Document {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let tags_json: String = row.try_get("tags")?;
        let tags = serde_json::from_str(&tags_json).map_err(|e| sqlx::Error::ColumnDecode {
            index: "tags".into(),
            source: Box::new(e),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            public_id: row.try_get("public_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            file_name: row.try_get("file_name")?,
            original_name: row.try_get("original_name")?,
            file_path: row.try_get("file_path")?,
            file_type: row.try_get("file_type")?,
            mime_type: row.try_get("mime_type")?,
            file_size: row.try_get("file_size")?,
            status: row.try_get("status")?,
            content: row.try_get("content")?,
            metadata: DocumentMetadata {
                page_count: row.try_get("page_count")?,
                word_count: row.try_get("word_count")?,
            },
            processing: DocumentProcessing {
                started_at: row.try_get("processing_started_at")?,
                completed_at: row.try_get("processing_completed_at")?,
                error: row.try_get("processing_error")?,
                retry_count: row.try_get("retry_count")?,
            },
            uploaded_by: row.try_get("uploaded_by")?,
            uploaded_by_public_id: row.try_get("uploaded_by_public_id")?,
            is_active: row.try_get("is_active")?,
            category: row.try_get("category")?,
            tags,
            usage_count: row.try_get("usage_count")?,
            last_used_at: row.try_get("last_used_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CreateDocumentRequest {
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_type: DocumentType,
    pub mime_type: String,
    pub file_size: i64,
    pub uploaded_by: i64,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub category: Option<String>,
    pub status: Option<DocumentStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUsage {
    #[serde(rename = "id")]
    pub public_id: String,
    pub title: String,
    pub usage_count: i64,
    pub last_used_at: Option<String>,
}

/// Dashboard projection of a frequently referenced document.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopDocument {
    #[serde(rename = "id")]
    pub public_id: String,
    pub title: String,
    pub file_type: DocumentType,
    pub reference_count: i64,
    pub last_used_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalytics {
    pub total_documents: i64,
    pub processed_documents: i64,
    pub failed_documents: i64,
    pub documents_by_category: Vec<CategoryCount>,
    pub top_used_documents: Vec<DocumentUsage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Docx,
    Txt,
    Md,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "pdf",
            DocumentType::Docx => "docx",
            DocumentType::Txt => "txt",
            DocumentType::Md => "md",
        }
    }

    /// Resolve a type from a file name's extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (_, extension) = name.rsplit_once('.')?;
        extension.to_ascii_lowercase().parse().ok()
    }

    /// Resolve a type from an upload's declared mime type.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        match essence {
            "application/pdf" => Some(DocumentType::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(DocumentType::Docx)
            }
            "text/plain" => Some(DocumentType::Txt),
            "text/markdown" | "text/x-markdown" => Some(DocumentType::Md),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentType::Pdf => "application/pdf",
            DocumentType::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentType::Txt => "text/plain",
            DocumentType::Md => "text/markdown",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(DocumentType::Pdf),
            "docx" => Ok(DocumentType::Docx),
            "txt" => Ok(DocumentType::Txt),
            "md" => Ok(DocumentType::Md),
            other => Err(format!("unsupported document type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Processed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Processed => "processed",
            DocumentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "processing" => Ok(DocumentStatus::Processing),
            "processed" => Ok(DocumentStatus::Processed),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("unknown document status '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_type_from_extension() {
        assert_eq!(DocumentType::from_file_name("Guide.PDF"), Some(DocumentType::Pdf));
        assert_eq!(DocumentType::from_file_name("notes.md"), Some(DocumentType::Md));
        assert_eq!(DocumentType::from_file_name("archive.tar.gz"), None);
        assert_eq!(DocumentType::from_file_name("README"), None);
    }

    #[test]
    fn resolves_type_from_mime() {
        assert_eq!(
            DocumentType::from_mime("text/plain; charset=utf-8"),
            Some(DocumentType::Txt)
        );
        assert_eq!(
            DocumentType::from_mime(DocumentType::Docx.mime_type()),
            Some(DocumentType::Docx)
        );
        assert_eq!(DocumentType::from_mime("image/png"), None);
    }
}
