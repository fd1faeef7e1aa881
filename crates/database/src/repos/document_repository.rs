//! Document repository for database operations

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, warn};

use crate::entities::document::DEFAULT_CATEGORY;
use crate::entities::{
    CreateDocumentRequest, Document, DocumentAnalytics, DocumentFilter, DocumentStatus,
    DocumentUsage, TopDocument, UpdateDocumentRequest,
};
use crate::search::{fts_query, like_pattern};
use crate::time::now_timestamp;
use crate::types::{CategoryCount, DocumentError, DocumentResult, PageRequest};

const DOCUMENT_FIELDS: &str = "d.id, d.public_id, d.title, d.description, d.file_name, d.original_name, \
     d.file_path, d.file_type, d.mime_type, d.file_size, d.status, d.page_count, d.word_count, \
     d.processing_started_at, d.processing_completed_at, d.processing_error, d.retry_count, \
     d.uploaded_by, u.public_id AS uploaded_by_public_id, d.is_active, d.category, d.tags, \
     d.usage_count, d.last_used_at, d.created_at, d.updated_at";

/// Repository for document database operations
#[derive(Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn select(with_content: bool) -> String {
        let content = if with_content { "d.content" } else { "NULL AS content" };
        format!("SELECT {DOCUMENT_FIELDS}, {content} FROM documents d JOIN users u ON u.id = d.uploaded_by")
    }

    /// Insert a freshly uploaded document. Records start in `processing`.
    pub async fn create(&self, request: &CreateDocumentRequest) -> DocumentResult<Document> {
        let now = now_timestamp();
        let public_id = cuid2::cuid();
        let tags = serde_json::to_string(&request.tags)?;

        let result = sqlx::query(
            "INSERT INTO documents (public_id, title, description, file_name, original_name, file_path,
                                    file_type, mime_type, file_size, status, processing_started_at,
                                    uploaded_by, is_active, category, tags, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 'processing', ?, ?, 1, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&request.title)
        .bind(request.description.as_deref())
        .bind(&request.file_name)
        .bind(&request.original_name)
        .bind(&request.file_path)
        .bind(request.file_type)
        .bind(&request.mime_type)
        .bind(request.file_size)
        .bind(&now)
        .bind(request.uploaded_by)
        .bind(request.category.as_deref().unwrap_or(DEFAULT_CATEGORY))
        .bind(tags)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        info!(document_id = %public_id, file_type = %request.file_type, "created document");

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or(DocumentError::DocumentNotFound)
    }

    pub async fn find_by_id(&self, id: i64) -> DocumentResult<Option<Document>> {
        let document = sqlx::query_as::<_, Document>(&format!("{} WHERE d.id = ?", Self::select(true)))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(document)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DocumentResult<Option<Document>> {
        let document =
            sqlx::query_as::<_, Document>(&format!("{} WHERE d.public_id = ?", Self::select(true)))
                .bind(public_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(document)
    }

    fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a DocumentFilter) {
        builder.push(" WHERE d.is_active = 1");
        if let Some(category) = filter.category.as_deref() {
            builder.push(" AND d.category = ").push_bind(category);
        }
        if let Some(status) = filter.status {
            builder.push(" AND d.status = ").push_bind(status);
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            builder
                .push(" AND (d.title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR d.description LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
    }

    /// Active documents without their extracted text, newest first.
    pub async fn list(
        &self,
        filter: &DocumentFilter,
        page: PageRequest,
    ) -> DocumentResult<(Vec<Document>, i64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM documents d");
        Self::push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(Self::select(false));
        Self::push_filter(&mut select, filter);
        select
            .push(" ORDER BY d.created_at DESC, d.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let documents = select.build_query_as::<Document>().fetch_all(&self.pool).await?;

        Ok((documents, total))
    }

    pub async fn update_metadata(
        &self,
        id: i64,
        request: &UpdateDocumentRequest,
    ) -> DocumentResult<Document> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE documents SET updated_at = ");
        builder.push_bind(now_timestamp());
        if let Some(title) = &request.title {
            builder.push(", title = ").push_bind(title.clone());
        }
        if let Some(description) = &request.description {
            builder.push(", description = ").push_bind(description.clone());
        }
        if let Some(category) = &request.category {
            builder.push(", category = ").push_bind(category.clone());
        }
        if let Some(tags) = &request.tags {
            builder.push(", tags = ").push_bind(serde_json::to_string(tags)?);
        }
        if let Some(is_active) = request.is_active {
            builder.push(", is_active = ").push_bind(is_active);
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DocumentError::DocumentNotFound);
        }
        self.find_by_id(id).await?.ok_or(DocumentError::DocumentNotFound)
    }

    /// Move a document back into `processing` and clear the previous error.
    pub async fn mark_processing(&self, id: i64) -> DocumentResult<()> {
        let now = now_timestamp();
        self.expect_row(
            sqlx::query(
                "UPDATE documents SET status = 'processing', processing_started_at = ?,
                        processing_completed_at = NULL, processing_error = NULL, updated_at = ?
                 WHERE id = ?",
            )
            .bind(&now)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected(),
        )
    }

    pub async fn mark_processed(
        &self,
        id: i64,
        content: &str,
        page_count: Option<i64>,
        word_count: i64,
    ) -> DocumentResult<()> {
        let now = now_timestamp();
        self.expect_row(
            sqlx::query(
                "UPDATE documents SET status = 'processed', content = ?, page_count = ?, word_count = ?,
                        processing_completed_at = ?, processing_error = NULL, updated_at = ?
                 WHERE id = ?",
            )
            .bind(content)
            .bind(page_count)
            .bind(word_count)
            .bind(&now)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected(),
        )?;
        info!(document_id = id, word_count, "document processed");
        Ok(())
    }

    pub async fn mark_failed(&self, id: i64, error: &str) -> DocumentResult<()> {
        self.expect_row(
            sqlx::query(
                "UPDATE documents SET status = 'failed', processing_error = ?,
                        retry_count = retry_count + 1, updated_at = ?
                 WHERE id = ?",
            )
            .bind(error)
            .bind(now_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected(),
        )?;
        warn!(document_id = id, error, "document processing failed");
        Ok(())
    }

    pub async fn soft_delete(&self, id: i64) -> DocumentResult<()> {
        self.expect_row(
            sqlx::query("UPDATE documents SET is_active = 0, updated_at = ? WHERE id = ?")
                .bind(now_timestamp())
                .bind(id)
                .execute(&self.pool)
                .await?
                .rows_affected(),
        )
    }

    fn expect_row(&self, rows_affected: u64) -> DocumentResult<()> {
        if rows_affected == 0 {
            Err(DocumentError::DocumentNotFound)
        } else {
            Ok(())
        }
    }

    pub async fn categories(&self) -> DocumentResult<Vec<String>> {
        let categories = sqlx::query_scalar(
            "SELECT DISTINCT category FROM documents WHERE is_active = 1 ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    /// Full-text search over active, processed documents, best match first.
    pub async fn search(&self, query: &str, limit: i64) -> DocumentResult<Vec<Document>> {
        let Some(expression) = fts_query(query) else {
            return Ok(Vec::new());
        };

        let documents = sqlx::query_as::<_, Document>(&format!(
            "{} JOIN documents_fts ON documents_fts.rowid = d.id
             WHERE documents_fts MATCH ? AND d.is_active = 1 AND d.status = 'processed'
             ORDER BY documents_fts.rank LIMIT ?",
            Self::select(true)
        ))
        .bind(expression)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }

    /// Most used processed documents; the context fallback when search finds nothing.
    pub async fn top_by_usage(&self, limit: i64) -> DocumentResult<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(&format!(
            "{} WHERE d.is_active = 1 AND d.status = 'processed'
             ORDER BY d.usage_count DESC, d.id ASC LIMIT ?",
            Self::select(true)
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }

    pub async fn increment_usage(&self, public_id: &str) -> DocumentResult<()> {
        let now = now_timestamp();
        sqlx::query(
            "UPDATE documents SET usage_count = usage_count + 1, last_used_at = ?, updated_at = ?
             WHERE public_id = ?",
        )
        .bind(&now)
        .bind(&now)
        .bind(public_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn top_documents(&self, limit: i64) -> DocumentResult<Vec<TopDocument>> {
        let documents = sqlx::query_as::<_, TopDocument>(
            "SELECT public_id, title, file_type, usage_count AS reference_count, last_used_at
             FROM documents WHERE is_active = 1 AND status = 'processed'
             ORDER BY usage_count DESC, id ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }

    pub async fn count_active(&self) -> DocumentResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn analytics(&self) -> DocumentResult<DocumentAnalytics> {
        let (total_documents, processed_documents, failed_documents): (i64, i64, i64) =
            sqlx::query_as(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN status = 'processed' THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0)
                 FROM documents WHERE is_active = 1",
            )
            .fetch_one(&self.pool)
            .await?;

        let documents_by_category = sqlx::query_as::<_, CategoryCount>(
            "SELECT category, COUNT(*) AS count FROM documents WHERE is_active = 1
             GROUP BY category ORDER BY count DESC, category",
        )
        .fetch_all(&self.pool)
        .await?;

        let top_used_documents = sqlx::query_as::<_, DocumentUsage>(
            "SELECT public_id, title, usage_count, last_used_at FROM documents
             WHERE is_active = 1 AND status = ?
             ORDER BY usage_count DESC, id ASC LIMIT 10",
        )
        .bind(DocumentStatus::Processed)
        .fetch_all(&self.pool)
        .await?;

        Ok(DocumentAnalytics {
            total_documents,
            processed_documents,
            failed_documents,
            documents_by_category,
            top_used_documents,
        })
    }
}
