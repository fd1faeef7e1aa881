//! Message repository for database operations

use sqlx::SqlitePool;

use crate::entities::{CreateMessageRequest, Message};
use crate::time::now_timestamp;
use crate::types::{ChatError, ChatResult};

const MESSAGE_SELECT: &str = "SELECT m.id, m.public_id, m.chat_id, c.public_id AS chat_public_id, \
     m.message_type, m.content, m.model, m.provider, m.prompt_tokens, m.completion_tokens, \
     m.total_tokens, m.response_time_ms, m.context_sources, m.error_code, m.error_message, \
     m.feedback_helpful, m.feedback_text, m.feedback_at, m.created_at, m.updated_at \
     FROM messages m JOIN chats c ON c.id = m.chat_id";

/// Repository for message database operations
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateMessageRequest) -> ChatResult<Message> {
        let now = now_timestamp();
        let public_id = cuid2::cuid();
        let metadata = &request.metadata;
        let context_sources = serde_json::to_string(&metadata.context_sources)?;
        let tokens = metadata.tokens_used;
        let (error_code, error_message) = match &metadata.error {
            Some(error) => (Some(error.code.as_str()), Some(error.message.as_str())),
            None => (None, None),
        };

        let result = sqlx::query(
            "INSERT INTO messages (public_id, chat_id, message_type, content, model, provider,
                                   prompt_tokens, completion_tokens, total_tokens, response_time_ms,
                                   context_sources, error_code, error_message, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.chat_id)
        .bind(request.message_type)
        .bind(&request.content)
        .bind(metadata.model.as_deref())
        .bind(metadata.provider.as_deref())
        .bind(tokens.map(|t| t.prompt))
        .bind(tokens.map(|t| t.completion))
        .bind(tokens.map(|t| t.total))
        .bind(metadata.response_time_ms)
        .bind(context_sources)
        .bind(error_code)
        .bind(error_message)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| ChatError::DatabaseError("failed to retrieve created message".to_string()))
    }

    pub async fn find_by_id(&self, id: i64) -> ChatResult<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(&format!("{MESSAGE_SELECT} WHERE m.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(message)
    }

    /// Fetch a message together with the user id of the chat that owns it.
    pub async fn find_by_public_id_with_owner(
        &self,
        public_id: &str,
    ) -> ChatResult<Option<(Message, i64)>> {
        let Some(message) = sqlx::query_as::<_, Message>(&format!("{MESSAGE_SELECT} WHERE m.public_id = ?"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let owner: i64 = sqlx::query_scalar("SELECT user_id FROM chats WHERE id = ?")
            .bind(message.chat_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(Some((message, owner)))
    }

    /// The newest `limit` messages of a chat, returned oldest first.
    pub async fn recent_for_chat(&self, chat_id: i64, limit: i64) -> ChatResult<Vec<Message>> {
        let mut messages = sqlx::query_as::<_, Message>(&format!(
            "{MESSAGE_SELECT} WHERE m.chat_id = ? ORDER BY m.created_at DESC, m.id DESC LIMIT ?"
        ))
        .bind(chat_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        messages.reverse();
        Ok(messages)
    }

    pub async fn list_for_chat(&self, chat_id: i64) -> ChatResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(&format!(
            "{MESSAGE_SELECT} WHERE m.chat_id = ? ORDER BY m.created_at ASC, m.id ASC"
        ))
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    pub async fn set_feedback(&self, id: i64, helpful: bool, text: Option<&str>) -> ChatResult<()> {
        let now = now_timestamp();
        let result = sqlx::query(
            "UPDATE messages SET feedback_helpful = ?, feedback_text = ?, feedback_at = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(helpful)
        .bind(text)
        .bind(&now)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(ChatError::MessageNotFound);
        }
        Ok(())
    }

    pub async fn count_for_chat(&self, chat_id: i64) -> ChatResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
