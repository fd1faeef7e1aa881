//! FAQ repository for database operations

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::entities::document::DEFAULT_CATEGORY;
use crate::entities::{
    CreateFaqRequest, Faq, FaqAnalytics, FaqFeedbackStats, FaqFilter, FaqViews, PublicFaq,
    UpdateFaqRequest,
};
use crate::search::{fts_query, like_pattern};
use crate::time::now_timestamp;
use crate::types::{CategoryCount, FaqError, FaqResult, PageRequest};

const FAQ_SELECT: &str = "SELECT f.id, f.public_id, f.question, f.answer, f.category, f.tags, \
     f.alternative_questions, f.keywords, f.priority, f.is_active, f.is_public, f.created_by, \
     cu.public_id AS created_by_public_id, uu.public_id AS updated_by_public_id, f.view_count, \
     f.useful_count, f.not_useful_count, f.last_used_at, f.created_at, f.updated_at \
     FROM faqs f JOIN users cu ON cu.id = f.created_by LEFT JOIN users uu ON uu.id = f.updated_by";

/// Repository for FAQ database operations
#[derive(Clone)]
pub struct FaqRepository {
    pool: SqlitePool,
}

impl FaqRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateFaqRequest) -> FaqResult<Faq> {
        let now = now_timestamp();
        let public_id = cuid2::cuid();

        let result = sqlx::query(
            "INSERT INTO faqs (public_id, question, answer, category, tags, alternative_questions, keywords,
                               priority, is_active, is_public, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.question.trim())
        .bind(request.answer.trim())
        .bind(request.category.as_deref().unwrap_or(DEFAULT_CATEGORY))
        .bind(serde_json::to_string(&request.tags)?)
        .bind(serde_json::to_string(&request.alternative_questions)?)
        .bind(serde_json::to_string(&lowercase(&request.keywords))?)
        .bind(request.priority)
        .bind(request.is_public)
        .bind(request.created_by)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        info!(faq_id = %public_id, created_by = request.created_by, "created faq");

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or(FaqError::FaqNotFound)
    }

    pub async fn find_by_id(&self, id: i64) -> FaqResult<Option<Faq>> {
        let faq = sqlx::query_as::<_, Faq>(&format!("{FAQ_SELECT} WHERE f.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(faq)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> FaqResult<Option<Faq>> {
        let faq = sqlx::query_as::<_, Faq>(&format!("{FAQ_SELECT} WHERE f.public_id = ?"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(faq)
    }

    fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a FaqFilter) {
        builder.push(" WHERE f.is_active = 1");
        if let Some(is_public) = filter.is_public {
            builder.push(" AND f.is_public = ").push_bind(is_public);
        }
        if let Some(category) = filter.category.as_deref() {
            builder.push(" AND f.category = ").push_bind(category);
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            builder
                .push(" AND (f.question LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR f.answer LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR f.keywords LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
    }

    /// Active FAQs ordered by priority, then views.
    pub async fn list(&self, filter: &FaqFilter, page: PageRequest) -> FaqResult<(Vec<Faq>, i64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM faqs f");
        Self::push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(FAQ_SELECT);
        Self::push_filter(&mut select, filter);
        select
            .push(" ORDER BY f.priority DESC, f.view_count DESC, f.id ASC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let faqs = select.build_query_as::<Faq>().fetch_all(&self.pool).await?;

        Ok((faqs, total))
    }

    pub async fn public_list(&self, category: Option<&str>) -> FaqResult<Vec<PublicFaq>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT public_id, question, answer, category, tags FROM faqs WHERE is_active = 1 AND is_public = 1",
        );
        if let Some(category) = category {
            builder.push(" AND category = ").push_bind(category);
        }
        builder.push(" ORDER BY priority DESC, view_count DESC, id ASC");

        let faqs = builder.build_query_as::<PublicFaq>().fetch_all(&self.pool).await?;
        Ok(faqs)
    }

    pub async fn update(&self, id: i64, request: &UpdateFaqRequest, updated_by: i64) -> FaqResult<Faq> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE faqs SET updated_at = ");
        builder.push_bind(now_timestamp());
        builder.push(", updated_by = ").push_bind(updated_by);
        if let Some(question) = &request.question {
            builder.push(", question = ").push_bind(question.trim().to_string());
        }
        if let Some(answer) = &request.answer {
            builder.push(", answer = ").push_bind(answer.trim().to_string());
        }
        if let Some(category) = &request.category {
            builder.push(", category = ").push_bind(category.clone());
        }
        if let Some(tags) = &request.tags {
            builder.push(", tags = ").push_bind(serde_json::to_string(tags)?);
        }
        if let Some(keywords) = &request.keywords {
            builder
                .push(", keywords = ")
                .push_bind(serde_json::to_string(&lowercase(keywords))?);
        }
        if let Some(alternatives) = &request.alternative_questions {
            builder
                .push(", alternative_questions = ")
                .push_bind(serde_json::to_string(alternatives)?);
        }
        if let Some(priority) = request.priority {
            builder.push(", priority = ").push_bind(priority);
        }
        if let Some(is_active) = request.is_active {
            builder.push(", is_active = ").push_bind(is_active);
        }
        if let Some(is_public) = request.is_public {
            builder.push(", is_public = ").push_bind(is_public);
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(FaqError::FaqNotFound);
        }
        info!(faq_id = id, updated_by, "updated faq");
        self.find_by_id(id).await?.ok_or(FaqError::FaqNotFound)
    }

    pub async fn soft_delete(&self, id: i64) -> FaqResult<()> {
        let result = sqlx::query("UPDATE faqs SET is_active = 0, updated_at = ? WHERE id = ?")
            .bind(now_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(FaqError::FaqNotFound);
        }
        Ok(())
    }

    pub async fn add_feedback(&self, id: i64, useful: bool) -> FaqResult<()> {
        let column = if useful { "useful_count" } else { "not_useful_count" };
        let result = sqlx::query(&format!(
            "UPDATE faqs SET {column} = {column} + 1, updated_at = ? WHERE id = ?"
        ))
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(FaqError::FaqNotFound);
        }
        Ok(())
    }

    pub async fn categories(&self) -> FaqResult<Vec<String>> {
        let categories =
            sqlx::query_scalar("SELECT DISTINCT category FROM faqs WHERE is_active = 1 ORDER BY category")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    /// Full-text search over active public FAQs, best match first.
    pub async fn search(&self, query: &str, limit: i64) -> FaqResult<Vec<Faq>> {
        let Some(expression) = fts_query(query) else {
            return Ok(Vec::new());
        };

        let faqs = sqlx::query_as::<_, Faq>(&format!(
            "{FAQ_SELECT} JOIN faqs_fts ON faqs_fts.rowid = f.id
             WHERE faqs_fts MATCH ? AND f.is_active = 1 AND f.is_public = 1
             ORDER BY faqs_fts.rank LIMIT ?"
        ))
        .bind(expression)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(faqs)
    }

    /// Highest priority public FAQs; the context fallback when search finds nothing.
    pub async fn top_by_priority(&self, limit: i64) -> FaqResult<Vec<Faq>> {
        let faqs = sqlx::query_as::<_, Faq>(&format!(
            "{FAQ_SELECT} WHERE f.is_active = 1 AND f.is_public = 1
             ORDER BY f.priority DESC, f.view_count DESC, f.id ASC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(faqs)
    }

    pub async fn increment_views(&self, public_id: &str) -> FaqResult<()> {
        let now = now_timestamp();
        sqlx::query(
            "UPDATE faqs SET view_count = view_count + 1, last_used_at = ?, updated_at = ? WHERE public_id = ?",
        )
        .bind(&now)
        .bind(&now)
        .bind(public_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count_all(&self) -> FaqResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM faqs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn analytics(&self) -> FaqResult<FaqAnalytics> {
        let (total_faqs, public_faqs): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(is_public), 0) FROM faqs WHERE is_active = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        let faqs_by_category = sqlx::query_as::<_, CategoryCount>(
            "SELECT category, COUNT(*) AS count FROM faqs WHERE is_active = 1
             GROUP BY category ORDER BY count DESC, category",
        )
        .fetch_all(&self.pool)
        .await?;

        let top_viewed_faqs = sqlx::query_as::<_, FaqViews>(
            "SELECT public_id, question, view_count, useful_count, not_useful_count FROM faqs
             WHERE is_active = 1 ORDER BY view_count DESC, id ASC LIMIT 10",
        )
        .fetch_all(&self.pool)
        .await?;

        let feedback_stats = sqlx::query_as::<_, FaqFeedbackStats>(
            "SELECT COALESCE(SUM(view_count), 0) AS total_views,
                    COALESCE(SUM(useful_count), 0) AS total_useful,
                    COALESCE(SUM(not_useful_count), 0) AS total_not_useful
             FROM faqs WHERE is_active = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(FaqAnalytics {
            total_faqs,
            public_faqs,
            faqs_by_category,
            top_viewed_faqs,
            feedback_stats,
        })
    }
}

fn lowercase(values: &[String]) -> Vec<String> {
    values.iter().map(|value| value.trim().to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::test_support::{insert_user, migrated_pool};

    async fn setup() -> (FaqRepository, i64, tempfile::TempDir) {
        let (pool, temp_dir) = migrated_pool().await;
        let admin = insert_user(&pool, "faq@example.com", UserRole::Admin).await;
        (FaqRepository::new(pool), admin.id, temp_dir)
    }

    fn faq(question: &str, answer: &str, priority: i64, created_by: i64) -> CreateFaqRequest {
        CreateFaqRequest {
            question: question.to_string(),
            answer: answer.to_string(),
            category: None,
            tags: Vec::new(),
            keywords: Vec::new(),
            alternative_questions: Vec::new(),
            priority,
            is_public: true,
            created_by,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_and_keyword_casing() {
        let (repo, admin, _temp_dir) = setup().await;

        let mut request = faq("How do I reset my password?", "Use the reset link.", 10, admin);
        request.keywords = vec!["Reset".into(), " PASSWORD ".into()];
        let created = repo.create(&request).await.unwrap();

        assert_eq!(created.category, "General");
        assert_eq!(created.keywords, vec!["reset", "password"]);
        assert!(created.is_public);
        assert!(created.updated_by_public_id.is_none());
    }

    #[tokio::test]
    async fn test_list_orders_by_priority_then_views() {
        let (repo, admin, _temp_dir) = setup().await;

        let low = repo.create(&faq("Low?", "a", 1, admin)).await.unwrap();
        let high = repo.create(&faq("High?", "b", 50, admin)).await.unwrap();
        let low_viewed = repo.create(&faq("Low viewed?", "c", 1, admin)).await.unwrap();
        repo.increment_views(&low_viewed.public_id).await.unwrap();

        let (faqs, total) = repo.list(&FaqFilter::default(), PageRequest::default()).await.unwrap();
        assert_eq!(total, 3);
        let order: Vec<_> = faqs.iter().map(|f| f.public_id.as_str()).collect();
        assert_eq!(order, vec![high.public_id.as_str(), low_viewed.public_id.as_str(), low.public_id.as_str()]);
    }

    #[tokio::test]
    async fn test_private_and_deleted_faqs_are_hidden_from_public_queries() {
        let (repo, admin, _temp_dir) = setup().await;

        let public = repo
            .create(&faq("Shipping times?", "Two days.", 0, admin))
            .await
            .unwrap();
        let mut private = faq("Shipping internal?", "Staff only.", 0, admin);
        private.is_public = false;
        repo.create(&private).await.unwrap();
        let removed = repo.create(&faq("Old shipping?", "Gone.", 0, admin)).await.unwrap();
        repo.soft_delete(removed.id).await.unwrap();

        let listed = repo.public_list(None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].public_id, public.public_id);

        let hits = repo.search("shipping", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].public_id, public.public_id);

        let (admin_view, _) = repo.list(&FaqFilter::default(), PageRequest::default()).await.unwrap();
        assert_eq!(admin_view.len(), 2);
    }

    #[tokio::test]
    async fn test_update_tracks_editor_and_reindexes() {
        let (pool, temp_dir) = migrated_pool().await;
        let author = insert_user(&pool, "author@example.com", UserRole::Admin).await;
        let editor = insert_user(&pool, "editor@example.com", UserRole::Admin).await;
        let repo = FaqRepository::new(pool);
        let _guard = temp_dir;

        let created = repo.create(&faq("Billing cycle?", "Monthly.", 0, author.id)).await.unwrap();
        let updated = repo
            .update(
                created.id,
                &UpdateFaqRequest {
                    question: Some("Invoice schedule?".into()),
                    priority: Some(90),
                    ..Default::default()
                },
                editor.id,
            )
            .await
            .unwrap();

        assert_eq!(updated.question, "Invoice schedule?");
        assert_eq!(updated.priority, 90);
        assert_eq!(updated.updated_by_public_id.as_deref(), Some(editor.public_id.as_str()));
        assert_eq!(repo.search("invoice", 5).await.unwrap().len(), 1);
        assert!(repo.search("billing", 5).await.unwrap().is_empty());

        let missing = repo.update(999, &UpdateFaqRequest::default(), editor.id).await;
        assert!(matches!(missing, Err(FaqError::FaqNotFound)));
    }

    #[tokio::test]
    async fn test_feedback_categories_and_analytics() {
        let (repo, admin, _temp_dir) = setup().await;

        let mut billing = faq("Refunds?", "Within 30 days.", 0, admin);
        billing.category = Some("Billing".into());
        let billing = repo.create(&billing).await.unwrap();
        repo.create(&faq("Hours?", "9 to 5.", 0, admin)).await.unwrap();

        repo.add_feedback(billing.id, true).await.unwrap();
        repo.add_feedback(billing.id, true).await.unwrap();
        repo.add_feedback(billing.id, false).await.unwrap();
        repo.increment_views(&billing.public_id).await.unwrap();

        assert_eq!(repo.categories().await.unwrap(), vec!["Billing", "General"]);

        let analytics = repo.analytics().await.unwrap();
        assert_eq!(analytics.total_faqs, 2);
        assert_eq!(analytics.public_faqs, 2);
        assert_eq!(analytics.feedback_stats.total_useful, 2);
        assert_eq!(analytics.feedback_stats.total_not_useful, 1);
        assert_eq!(analytics.feedback_stats.total_views, 1);
        assert_eq!(analytics.top_viewed_faqs[0].public_id, billing.public_id);

        let top = repo.top_by_priority(5).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(repo.count_all().await.unwrap(), 2);
    }
}
