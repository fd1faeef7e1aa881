//! Repository for chat data access operations.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::entities::chat::DEFAULT_CHAT_TITLE;
use crate::entities::{Chat, ChatAnalytics, ChatFilter, ChatStatus, ChatWithOwner};
use crate::search::like_pattern;
use crate::time::{days_ago, now_timestamp, start_of_today};
use crate::types::{ChatError, ChatResult, DailyCount, PageRequest};

const CHAT_SELECT: &str = "SELECT c.id, c.public_id, c.user_id, u.public_id AS user_public_id, \
     c.title, c.status, c.message_count, c.last_message_at, c.created_at, c.updated_at \
     FROM chats c JOIN users u ON u.id = c.user_id";

const CHAT_WITH_OWNER_SELECT: &str = "SELECT c.id, c.public_id, c.user_id, u.public_id AS user_public_id, \
     c.title, c.status, c.message_count, c.last_message_at, c.created_at, c.updated_at, \
     u.first_name AS owner_first_name, u.last_name AS owner_last_name, u.email AS owner_email \
     FROM chats c JOIN users u ON u.id = c.user_id";

/// Repository for chat database operations
#[derive(Clone)]
pub struct ChatRepository {
    pool: SqlitePool,
}

impl ChatRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an active chat for `user_id`.
    pub async fn create(&self, user_id: i64, title: Option<&str>) -> ChatResult<Chat> {
        let now = now_timestamp();
        let public_id = cuid2::cuid();

        let result = sqlx::query(
            "INSERT INTO chats (public_id, user_id, title, status, message_count, last_message_at, created_at, updated_at)
             VALUES (?, ?, ?, 'active', 0, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(user_id)
        .bind(title.unwrap_or(DEFAULT_CHAT_TITLE))
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        info!(chat_id = %public_id, user_id, "created new chat");

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| ChatError::DatabaseError("failed to retrieve created chat".to_string()))
    }

    pub async fn find_by_id(&self, id: i64) -> ChatResult<Option<Chat>> {
        let chat = sqlx::query_as::<_, Chat>(&format!("{CHAT_SELECT} WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(chat)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> ChatResult<Option<Chat>> {
        let chat = sqlx::query_as::<_, Chat>(&format!("{CHAT_SELECT} WHERE c.public_id = ?"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(chat)
    }

    /// Find a chat owned by `user_id`, optionally restricted to one status.
    pub async fn find_for_user(
        &self,
        public_id: &str,
        user_id: i64,
        status: Option<ChatStatus>,
    ) -> ChatResult<Option<Chat>> {
        let mut builder = QueryBuilder::<Sqlite>::new(CHAT_SELECT);
        builder
            .push(" WHERE c.public_id = ")
            .push_bind(public_id)
            .push(" AND c.user_id = ")
            .push_bind(user_id);
        if let Some(status) = status {
            builder.push(" AND c.status = ").push_bind(status);
        }

        let chat = builder.build_query_as::<Chat>().fetch_optional(&self.pool).await?;
        Ok(chat)
    }

    /// Count one more message and bump `last_message_at`. Returns the new count.
    pub async fn record_message(&self, id: i64) -> ChatResult<i64> {
        let now = now_timestamp();
        let count: Option<i64> = sqlx::query_scalar(
            "UPDATE chats SET message_count = message_count + 1, last_message_at = ?, updated_at = ?
             WHERE id = ? RETURNING message_count",
        )
        .bind(&now)
        .bind(&now)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        count.ok_or(ChatError::ChatNotFound)
    }

    pub async fn set_title(&self, id: i64, title: &str) -> ChatResult<()> {
        let result = sqlx::query("UPDATE chats SET title = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(now_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ChatError::ChatNotFound);
        }
        Ok(())
    }

    /// A user's active chats, most recent activity first.
    pub async fn list_for_user(&self, user_id: i64, page: PageRequest) -> ChatResult<(Vec<Chat>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chats WHERE user_id = ? AND status = 'active'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let chats = sqlx::query_as::<_, Chat>(&format!(
            "{CHAT_SELECT} WHERE c.user_id = ? AND c.status = 'active'
             ORDER BY c.last_message_at DESC, c.id DESC LIMIT ? OFFSET ?"
        ))
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((chats, total))
    }

    fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a ChatFilter) {
        builder.push(" WHERE 1 = 1");
        if let Some(user_id) = filter.user_id.as_deref() {
            builder.push(" AND u.public_id = ").push_bind(user_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND c.status = ").push_bind(status);
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            builder
                .push(" AND c.title LIKE ")
                .push_bind(like_pattern(search))
                .push(" ESCAPE '\\'");
        }
    }

    /// Every chat matching `filter`, joined with its owner.
    pub async fn list_all(
        &self,
        filter: &ChatFilter,
        page: PageRequest,
    ) -> ChatResult<(Vec<ChatWithOwner>, i64)> {
        let mut count =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM chats c JOIN users u ON u.id = c.user_id");
        Self::push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(CHAT_WITH_OWNER_SELECT);
        Self::push_filter(&mut select, filter);
        select
            .push(" ORDER BY c.last_message_at DESC, c.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let chats = select
            .build_query_as::<ChatWithOwner>()
            .fetch_all(&self.pool)
            .await?;

        Ok((chats, total))
    }

    pub async fn recent(&self, limit: i64) -> ChatResult<Vec<ChatWithOwner>> {
        let chats = sqlx::query_as::<_, ChatWithOwner>(&format!(
            "{CHAT_WITH_OWNER_SELECT} ORDER BY c.last_message_at DESC, c.id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(chats)
    }

    /// Hard delete. Messages go with the chat through the foreign key cascade.
    pub async fn delete(&self, id: i64) -> ChatResult<()> {
        let result = sqlx::query("DELETE FROM chats WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ChatError::ChatNotFound);
        }
        info!(chat_id = id, "deleted chat");
        Ok(())
    }

    pub async fn analytics(&self) -> ChatResult<ChatAnalytics> {
        let (total_chats, active_chats, avg_messages_per_chat): (i64, i64, f64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN status = 'active' THEN 1 ELSE 0 END), 0),
                    COALESCE(AVG(message_count), 0.0)
             FROM chats",
        )
        .fetch_one(&self.pool)
        .await?;

        let (total_messages, messages_today): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN created_at >= ? THEN 1 ELSE 0 END), 0) FROM messages",
        )
        .bind(start_of_today())
        .fetch_one(&self.pool)
        .await?;

        let chats_by_day = sqlx::query_as::<_, DailyCount>(
            "SELECT substr(created_at, 1, 10) AS date, COUNT(*) AS count FROM chats
             WHERE created_at >= ? GROUP BY date ORDER BY date",
        )
        .bind(days_ago(30))
        .fetch_all(&self.pool)
        .await?;

        Ok(ChatAnalytics {
            total_chats,
            active_chats,
            total_messages,
            messages_today,
            avg_messages_per_chat,
            chats_by_day,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserRole;
    use crate::test_support::{insert_user, migrated_pool};

    #[tokio::test]
    async fn test_create_chat_defaults() {
        let (pool, _temp_dir) = migrated_pool().await;
        let user = insert_user(&pool, "chat@example.com", UserRole::User).await;
        let repo = ChatRepository::new(pool);

        let chat = repo.create(user.id, None).await.unwrap();
        assert_eq!(chat.title, "New Conversation");
        assert_eq!(chat.status, ChatStatus::Active);
        assert_eq!(chat.message_count, 0);
        assert_eq!(chat.user_public_id, user.public_id);
        assert_eq!(chat.last_message_at, chat.created_at);
    }

    #[tokio::test]
    async fn test_find_for_user_enforces_ownership_and_status() {
        let (pool, _temp_dir) = migrated_pool().await;
        let owner = insert_user(&pool, "owner@example.com", UserRole::User).await;
        let other = insert_user(&pool, "other@example.com", UserRole::User).await;
        let repo = ChatRepository::new(pool.clone());

        let chat = repo.create(owner.id, Some("Billing")).await.unwrap();

        assert!(repo
            .find_for_user(&chat.public_id, owner.id, Some(ChatStatus::Active))
            .await
            .unwrap()
            .is_some());
        assert!(repo
            .find_for_user(&chat.public_id, other.id, None)
            .await
            .unwrap()
            .is_none());

        sqlx::query("UPDATE chats SET status = 'archived' WHERE id = ?")
            .bind(chat.id)
            .execute(&pool)
            .await
            .unwrap();
        assert!(repo
            .find_for_user(&chat.public_id, owner.id, Some(ChatStatus::Active))
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_for_user(&chat.public_id, owner.id, None)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_record_message_and_title() {
        let (pool, _temp_dir) = migrated_pool().await;
        let user = insert_user(&pool, "count@example.com", UserRole::User).await;
        let repo = ChatRepository::new(pool);
        let chat = repo.create(user.id, None).await.unwrap();

        assert_eq!(repo.record_message(chat.id).await.unwrap(), 1);
        assert_eq!(repo.record_message(chat.id).await.unwrap(), 2);
        repo.set_title(chat.id, "Password reset").await.unwrap();

        let reloaded = repo.find_by_id(chat.id).await.unwrap().unwrap();
        assert_eq!(reloaded.message_count, 2);
        assert_eq!(reloaded.title, "Password reset");
        assert!(reloaded.last_message_at >= chat.last_message_at);

        assert!(matches!(repo.record_message(4242).await, Err(ChatError::ChatNotFound)));
    }

    #[tokio::test]
    async fn test_list_for_user_only_returns_active_chats() {
        let (pool, _temp_dir) = migrated_pool().await;
        let user = insert_user(&pool, "list@example.com", UserRole::User).await;
        let repo = ChatRepository::new(pool.clone());

        let first = repo.create(user.id, Some("first")).await.unwrap();
        let second = repo.create(user.id, Some("second")).await.unwrap();
        let archived = repo.create(user.id, Some("archived")).await.unwrap();
        sqlx::query("UPDATE chats SET status = 'archived' WHERE id = ?")
            .bind(archived.id)
            .execute(&pool)
            .await
            .unwrap();
        repo.record_message(first.id).await.unwrap();

        let (chats, total) = repo.list_for_user(user.id, PageRequest::default()).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(chats[0].public_id, first.public_id);
        assert_eq!(chats[1].public_id, second.public_id);
    }

    #[tokio::test]
    async fn test_list_all_filters_and_joins_owner() {
        let (pool, _temp_dir) = migrated_pool().await;
        let alice = insert_user(&pool, "alice@example.com", UserRole::User).await;
        let bob = insert_user(&pool, "bob@example.com", UserRole::User).await;
        let repo = ChatRepository::new(pool);

        repo.create(alice.id, Some("Refund request")).await.unwrap();
        repo.create(bob.id, Some("Shipping delay")).await.unwrap();

        let (all, total) = repo.list_all(&ChatFilter::default(), PageRequest::default()).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(all.len(), 2);

        let (bobs, _) = repo
            .list_all(
                &ChatFilter {
                    user_id: Some(bob.public_id.clone()),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].user.email, "bob@example.com");

        let (refunds, _) = repo
            .list_all(
                &ChatFilter {
                    search: Some("refund".into()),
                    ..Default::default()
                },
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0].chat.title, "Refund request");

        let recent = repo.recent(5).await.unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_cascades_messages() {
        let (pool, _temp_dir) = migrated_pool().await;
        let user = insert_user(&pool, "delete@example.com", UserRole::User).await;
        let repo = ChatRepository::new(pool.clone());
        let chat = repo.create(user.id, None).await.unwrap();

        crate::MessageRepository::new(pool.clone())
            .create(&crate::CreateMessageRequest::user(chat.id, "hello"))
            .await
            .unwrap();

        repo.delete(chat.id).await.unwrap();
        let (remaining,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(matches!(repo.delete(chat.id).await, Err(ChatError::ChatNotFound)));
    }

    #[tokio::test]
    async fn test_analytics() {
        let (pool, _temp_dir) = migrated_pool().await;
        let user = insert_user(&pool, "stats@example.com", UserRole::User).await;
        let repo = ChatRepository::new(pool.clone());
        let messages = crate::MessageRepository::new(pool);

        let chat = repo.create(user.id, None).await.unwrap();
        repo.create(user.id, None).await.unwrap();
        for text in ["one", "two"] {
            messages
                .create(&crate::CreateMessageRequest::user(chat.id, text))
                .await
                .unwrap();
            repo.record_message(chat.id).await.unwrap();
        }

        let analytics = repo.analytics().await.unwrap();
        assert_eq!(analytics.total_chats, 2);
        assert_eq!(analytics.active_chats, 2);
        assert_eq!(analytics.total_messages, 2);
        assert_eq!(analytics.messages_today, 2);
        assert!((analytics.avg_messages_per_chat - 1.0).abs() < f64::EPSILON);
        assert_eq!(analytics.chats_by_day.len(), 1);
        assert_eq!(analytics.chats_by_day[0].count, 2);
    }
}
