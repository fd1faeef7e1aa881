use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use supportdesk_config::AppConfig;
use supportdesk_database::initialize_database;
use supportdesk_orchestrator::Orchestrator;
use tracing::{info, warn};

pub mod seed;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub orchestrator: Arc<Orchestrator>,
}

impl BackendServices {
    /// Open the database, run migrations, register AI providers and make sure
    /// the upload directory exists. A missing AI key only produces a warning.
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .with_context(|| format!("failed to initialise database {}", config.database.url))?;

        let orchestrator = Arc::new(
            Orchestrator::new(config)
                .bootstrap()
                .context("failed to bootstrap orchestrator")?,
        );
        if !orchestrator.is_available() {
            warn!("no ai provider api key set, chat replies will return an apology");
        }

        let upload_dir = &config.uploads.directory;
        tokio::fs::create_dir_all(upload_dir)
            .await
            .with_context(|| format!("failed to create upload directory {upload_dir}"))?;

        info!(
            default_provider = ?orchestrator.default_provider(),
            upload_dir = %upload_dir,
            "backend services ready"
        );

        Ok(Self {
            db_pool,
            orchestrator,
        })
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
