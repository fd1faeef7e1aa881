//! Supportdesk Database Crate
//!
//! Connection management, migrations, entities and repositories for the
//! support desk backend. Everything is stored in SQLite; documents and FAQs
//! carry FTS5 indexes that back context retrieval.

use sqlx::SqlitePool;
use supportdesk_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod search;
pub mod time;
pub mod types;

pub use connection::prepare_database;
pub use migrations::{run_migrations, MIGRATOR};

pub use repos::{
    ChatRepository, DocumentRepository, FaqRepository, MessageRepository, UserRepository,
};

pub use entities::{
    chat::{Chat, ChatAnalytics, ChatFilter, ChatOwner, ChatStatus, ChatWithOwner, RecentChat},
    document::{
        CreateDocumentRequest, Document, DocumentAnalytics, DocumentFilter, DocumentStatus,
        DocumentType, DocumentUsage, TopDocument, UpdateDocumentRequest,
    },
    faq::{
        CreateFaqRequest, Faq, FaqAnalytics, FaqFeedbackStats, FaqFilter, FaqViews, PublicFaq,
        UpdateFaqRequest,
    },
    message::{
        ContextSource, ContextSourceKind, CreateMessageRequest, Message, MessageError,
        MessageFeedback, MessageMetadata, MessageType, TokenCounts,
    },
    user::{
        AdminUserUpdate, CreateUserRequest, UpdateProfileRequest, User, UserCredentials,
        UserFilter, UserRole, UserStats, UserSummary,
    },
};

pub use types::{
    errors::{ChatError, DatabaseError, DocumentError, FaqError, UserError},
    CategoryCount, ChatResult, DailyCount, DatabaseResult, DocumentResult, FaqResult, PageRequest,
    UserResult,
};

pub use sqlx::Pool;

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    pub async fn migrated_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 1,
        };

        let pool = initialize_database(&config).await.unwrap();
        (pool, temp_dir)
    }

    pub async fn insert_user(pool: &SqlitePool, email: &str, role: UserRole) -> User {
        UserRepository::new(pool.clone())
            .create(&CreateUserRequest {
                email: email.to_string(),
                password_hash: "hash".to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                role,
                is_verified: false,
            })
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_initialization() {
        let (pool, _temp_dir) = test_support::migrated_pool().await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'chats', 'messages', 'documents', 'faqs') ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let names: Vec<_> = tables.into_iter().map(|(name,)| name).collect();
        assert_eq!(names, vec!["chats", "documents", "faqs", "messages", "users"]);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let (pool, _temp_dir) = test_support::migrated_pool().await;

        let result: (bool,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert!(result.0);
    }
}
