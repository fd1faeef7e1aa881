//! Account authentication for the support desk backend.
//!
//! Passwords are hashed with argon2. Sessions are a pair of HS256 tokens: a
//! short lived access token and a refresh token whose latest value is stored
//! on the user row, so logging out or rotating invalidates older ones.

mod jwt;
mod password;
mod validation;

use std::time::Duration;

use serde::Serialize;
use sqlx::SqlitePool;
use supportdesk_config::AuthConfig;
use supportdesk_database::{
    CreateUserRequest, UpdateProfileRequest, User, UserCredentials, UserError, UserRepository,
    UserRole,
};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use jwt::{Claims, JwtManager, TokenError, TokenKind};
pub use password::{hash_password, verify_password};
pub use validation::{validate_email, validate_name, validate_password, MIN_PASSWORD_LENGTH};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User already exists with this email")]
    UserExists,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account has been deactivated")]
    AccountDeactivated,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token")]
    InvalidToken,
    #[error("User not found")]
    UserNotFound,
    #[error("Current password is incorrect")]
    IncorrectPassword,
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
    #[error("token signing failed: {0}")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),
}

impl From<UserError> for AuthError {
    fn from(error: UserError) -> Self {
        match error {
            UserError::UserNotFound => AuthError::UserNotFound,
            UserError::EmailAlreadyExists => AuthError::UserExists,
            UserError::DatabaseError(message) => AuthError::Database(message),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful register or login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone)]
pub struct Authenticator {
    users: UserRepository,
    access: JwtManager,
    refresh: JwtManager,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: &AuthConfig) -> Self {
        let access = JwtManager::new(
            &config.jwt_secret,
            config.issuer.clone(),
            TokenKind::Access,
            Duration::from_secs(config.access_token_ttl_seconds),
        );
        let refresh = JwtManager::new(
            &config.jwt_refresh_secret,
            config.issuer.clone(),
            TokenKind::Refresh,
            Duration::from_secs(config.refresh_token_ttl_seconds),
        );

        Self {
            users: UserRepository::new(pool),
            access,
            refresh,
        }
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    /// Create a regular user account and sign it in.
    pub async fn register(&self, registration: Registration) -> Result<AuthResponse, AuthError> {
        let email = registration.email.trim().to_lowercase();
        validate_email(&email).map_err(AuthError::Validation)?;
        validate_password(&registration.password).map_err(AuthError::Validation)?;
        validate_name("First name", registration.first_name.trim()).map_err(AuthError::Validation)?;
        validate_name("Last name", registration.last_name.trim()).map_err(AuthError::Validation)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::UserExists);
        }

        let password_hash = hash_password(&registration.password)?;
        let user = self
            .users
            .create(&CreateUserRequest {
                email,
                password_hash,
                first_name: registration.first_name,
                last_name: registration.last_name,
                role: UserRole::User,
                is_verified: false,
            })
            .await?;

        let tokens = self.issue_tokens(&user.public_id)?;
        self.users
            .set_refresh_token(user.id, Some(&tokens.refresh_token))
            .await?;

        info!(user_id = %user.public_id, "registered new user");
        Ok(AuthResponse { user, tokens })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let email = email.trim().to_lowercase();
        let credentials = self
            .users
            .find_credentials_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !credentials.is_active {
            return Err(AuthError::AccountDeactivated);
        }
        if !verify_password(password, &credentials.password_hash) {
            debug!(user_id = %credentials.public_id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let tokens = self.issue_tokens(&credentials.public_id)?;
        self.users
            .set_refresh_token(credentials.id, Some(&tokens.refresh_token))
            .await?;
        self.users.touch_last_login(credentials.id).await?;

        let user = self
            .users
            .find_by_id(credentials.id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!(user_id = %user.public_id, "user logged in");
        Ok(AuthResponse { user, tokens })
    }

    /// Exchange a refresh token for a new pair. The presented token must be
    /// the one currently stored for the user.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, AuthError> {
        let claims = self
            .refresh
            .validate_token(refresh_token)
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        let credentials = self
            .credentials_for(&claims.sub)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if !credentials.is_active || credentials.refresh_token.as_deref() != Some(refresh_token) {
            warn!(user_id = %credentials.public_id, "rejected stale refresh token");
            return Err(AuthError::InvalidRefreshToken);
        }

        let tokens = self.issue_tokens(&credentials.public_id)?;
        self.users
            .set_refresh_token(credentials.id, Some(&tokens.refresh_token))
            .await?;
        Ok(tokens)
    }

    pub async fn logout(&self, user_id: i64) -> Result<(), AuthError> {
        self.users.set_refresh_token(user_id, None).await?;
        debug!(user_id, "cleared refresh token");
        Ok(())
    }

    /// Resolve a bearer access token to an active user.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.access.validate_token(token).map_err(|err| match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Invalid => AuthError::InvalidToken,
        })?;

        let user = self
            .users
            .find_by_public_id(&claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }
        Ok(user)
    }

    pub async fn profile(&self, user_id: i64) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        request: UpdateProfileRequest,
    ) -> Result<User, AuthError> {
        if let Some(first_name) = request.first_name.as_deref() {
            validate_name("First name", first_name.trim()).map_err(AuthError::Validation)?;
        }
        if let Some(last_name) = request.last_name.as_deref() {
            validate_name("Last name", last_name.trim()).map_err(AuthError::Validation)?;
        }
        Ok(self.users.update_profile(user_id, &request).await?)
    }

    /// Replace the password after checking the current one. Existing refresh
    /// tokens stop working.
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let credentials = self
            .users
            .find_credentials_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !verify_password(current_password, &credentials.password_hash) {
            return Err(AuthError::IncorrectPassword);
        }
        validate_password(new_password).map_err(AuthError::Validation)?;

        let password_hash = hash_password(new_password)?;
        self.users.set_password_hash(user_id, &password_hash).await?;
        info!(user_id = %credentials.public_id, "password changed");
        Ok(())
    }

    async fn credentials_for(&self, public_id: &str) -> Result<Option<UserCredentials>, AuthError> {
        let Some(user) = self.users.find_by_public_id(public_id).await? else {
            return Ok(None);
        };
        Ok(self.users.find_credentials_by_id(user.id).await?)
    }

    fn issue_tokens(&self, public_id: &str) -> Result<AuthTokens, AuthError> {
        Ok(AuthTokens {
            access_token: self.access.generate_token(public_id)?,
            refresh_token: self.refresh.generate_token(public_id)?,
        })
    }
}
