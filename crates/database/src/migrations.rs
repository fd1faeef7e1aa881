//! Database migrations

use anyhow::Context;
use sqlx::{migrate::Migrator, SqlitePool};
use tracing::info;

/// Migrations embedded from the workspace `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("database migrations failed")?;
    info!("database migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::prepare_database;
    use supportdesk_config::DatabaseConfig;
    use tempfile::TempDir;

    async fn fresh_pool(temp_dir: &TempDir) -> SqlitePool {
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("m.db").display()),
            max_connections: 1,
        };
        prepare_database(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_migrations_run_and_are_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let pool = fresh_pool(&temp_dir).await;

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE name IN ('documents_fts', 'faqs_fts')")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 2);
    }
}
