use std::{path::PathBuf, sync::Arc, time::Duration, time::Instant};

use axum::http::HeaderMap;
use sqlx::SqlitePool;
use supportdesk_auth::{AuthError, Authenticator};
use supportdesk_config::AppConfig;
use supportdesk_database::{
    ChatRepository, DocumentRepository, FaqRepository, MessageRepository, User, UserRepository,
};
use supportdesk_orchestrator::Orchestrator;

use crate::rate_limit::RateLimiters;
use crate::util::require_bearer;
use crate::ApiError;

#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    config: Arc<AppConfig>,
    orchestrator: Arc<Orchestrator>,
    authenticator: Authenticator,
    users: UserRepository,
    chats: ChatRepository,
    messages: MessageRepository,
    documents: DocumentRepository,
    faqs: FaqRepository,
    rate_limits: RateLimiters,
    started_at: Instant,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: AppConfig, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            authenticator: Authenticator::new(pool.clone(), &config.auth),
            users: UserRepository::new(pool.clone()),
            chats: ChatRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            documents: DocumentRepository::new(pool.clone()),
            faqs: FaqRepository::new(pool.clone()),
            rate_limits: RateLimiters::from_config(&config.rate_limit),
            config: Arc::new(config),
            orchestrator,
            pool,
            started_at: Instant::now(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn chats(&self) -> &ChatRepository {
        &self.chats
    }

    pub fn messages(&self) -> &MessageRepository {
        &self.messages
    }

    pub fn documents(&self) -> &DocumentRepository {
        &self.documents
    }

    pub fn faqs(&self) -> &FaqRepository {
        &self.faqs
    }

    pub fn rate_limits(&self) -> &RateLimiters {
        &self.rate_limits
    }

    pub fn upload_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.uploads.directory)
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Resolve the bearer token in `headers` to an active user.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<User, ApiError> {
        let token = require_bearer(headers)?;
        self.authenticator
            .authenticate(&token)
            .await
            .map_err(|err| match err {
                AuthError::UserNotFound => ApiError::unauthorized("User not found. Token invalid."),
                AuthError::AccountDeactivated => {
                    ApiError::unauthorized("Account has been deactivated.")
                }
                other => ApiError::from(other),
            })
    }

    /// Like [`AppState::authenticate`], but only admins and super admins pass.
    pub async fn require_admin(&self, headers: &HeaderMap) -> Result<User, ApiError> {
        let user = self.authenticate(headers).await?;
        if !user.is_admin() {
            return Err(ApiError::forbidden(
                "Access denied. Required role: admin or super_admin",
            ));
        }
        Ok(user)
    }
}
