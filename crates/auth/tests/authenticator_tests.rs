use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use supportdesk_auth::{AuthError, Authenticator, Registration};
use supportdesk_config::AuthConfig;
use supportdesk_database::{UpdateProfileRequest, UserRole};
use tempfile::TempDir;

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

struct TestContext {
    pool: SqlitePool,
    authenticator: Authenticator,
    _temp_dir: TempDir,
}

impl TestContext {
    async fn new(config: AuthConfig) -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("auth.sqlite");
        let db_url = format!("sqlite://{}", db_path.display());

        let mut options = SqliteConnectOptions::from_str(&db_url)?;
        options = options.create_if_missing(true);
        options = options.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;

        let authenticator = Authenticator::new(pool.clone(), &config);

        Ok(Self {
            pool,
            authenticator,
            _temp_dir: temp_dir,
        })
    }

    async fn new_default() -> TestResult<Self> {
        Self::new(AuthConfig::default()).await
    }

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }
}

fn registration(email: &str, password: &str) -> Registration {
    Registration {
        email: email.to_string(),
        password: password.to_string(),
        first_name: "Alice".to_string(),
        last_name: "Smith".to_string(),
    }
}

#[tokio::test]
async fn register_persists_user_with_argon2_hash() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let response = ctx
        .authenticator()
        .register(registration("Alice@Example.com", "Secret123"))
        .await?;

    assert_eq!(response.user.email, "alice@example.com");
    assert_eq!(response.user.role, UserRole::User);
    assert!(!response.user.is_verified);
    assert!(!response.tokens.access_token.is_empty());

    let (hash, stored_refresh): (String, Option<String>) =
        sqlx::query_as("SELECT password_hash, refresh_token FROM users WHERE id = ?")
            .bind(response.user.id)
            .fetch_one(ctx.pool())
            .await?;
    assert!(hash.starts_with("$argon2"), "password must be an argon2 hash");
    assert_eq!(stored_refresh.as_deref(), Some(response.tokens.refresh_token.as_str()));

    Ok(())
}

#[tokio::test]
async fn register_rejects_duplicate_email() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.authenticator()
        .register(registration("alice@example.com", "Secret123"))
        .await?;

    let err = ctx
        .authenticator()
        .register(registration("ALICE@example.com", "Another123"))
        .await
        .expect_err("expected duplicate email to fail");
    assert!(matches!(err, AuthError::UserExists));

    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(user_count, 1, "no additional users should be created");

    Ok(())
}

#[tokio::test]
async fn register_validates_input() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let err = ctx
        .authenticator()
        .register(registration("not-an-email", "Secret123"))
        .await
        .expect_err("invalid email");
    assert!(matches!(err, AuthError::Validation(ref m) if m == "Please provide a valid email"));

    let err = ctx
        .authenticator()
        .register(registration("bob@example.com", "short"))
        .await
        .expect_err("short password");
    assert!(matches!(err, AuthError::Validation(ref m) if m.contains("at least 8")));

    let mut blank_name = registration("carol@example.com", "Secret123");
    blank_name.first_name = "  ".into();
    let err = ctx
        .authenticator()
        .register(blank_name)
        .await
        .expect_err("blank name");
    assert!(matches!(err, AuthError::Validation(ref m) if m == "First name is required"));

    Ok(())
}

#[tokio::test]
async fn login_returns_tokens_and_records_login() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.authenticator()
        .register(registration("alice@example.com", "Secret123"))
        .await?;

    let response = ctx
        .authenticator()
        .login("alice@example.com", "Secret123")
        .await?;
    assert!(response.user.last_login_at.is_some());

    let user = ctx
        .authenticator()
        .authenticate(&response.tokens.access_token)
        .await?;
    assert_eq!(user.public_id, response.user.public_id);

    Ok(())
}

#[tokio::test]
async fn login_rejects_bad_credentials_and_inactive_accounts() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let registered = ctx
        .authenticator()
        .register(registration("alice@example.com", "Secret123"))
        .await?;

    let err = ctx
        .authenticator()
        .login("alice@example.com", "Wrong1234")
        .await
        .expect_err("wrong password");
    assert!(matches!(err, AuthError::InvalidCredentials));

    let err = ctx
        .authenticator()
        .login("nobody@example.com", "Secret123")
        .await
        .expect_err("unknown email");
    assert!(matches!(err, AuthError::InvalidCredentials));

    ctx.authenticator().users().deactivate(registered.user.id).await?;
    let err = ctx
        .authenticator()
        .login("alice@example.com", "Secret123")
        .await
        .expect_err("inactive account");
    assert!(matches!(err, AuthError::AccountDeactivated));

    let err = ctx
        .authenticator()
        .authenticate(&registered.tokens.access_token)
        .await
        .expect_err("inactive account token");
    assert!(matches!(err, AuthError::AccountDeactivated));

    Ok(())
}

#[tokio::test]
async fn refresh_rotates_tokens_and_rejects_old_ones() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let registered = ctx
        .authenticator()
        .register(registration("alice@example.com", "Secret123"))
        .await?;

    let rotated = ctx
        .authenticator()
        .refresh(&registered.tokens.refresh_token)
        .await?;
    assert_ne!(rotated.refresh_token, registered.tokens.refresh_token);

    let err = ctx
        .authenticator()
        .refresh(&registered.tokens.refresh_token)
        .await
        .expect_err("stale refresh token");
    assert!(matches!(err, AuthError::InvalidRefreshToken));

    let err = ctx
        .authenticator()
        .refresh(&rotated.access_token)
        .await
        .expect_err("access token is not a refresh token");
    assert!(matches!(err, AuthError::InvalidRefreshToken));

    ctx.authenticator().logout(registered.user.id).await?;
    let err = ctx
        .authenticator()
        .refresh(&rotated.refresh_token)
        .await
        .expect_err("refresh after logout");
    assert!(matches!(err, AuthError::InvalidRefreshToken));

    Ok(())
}

#[tokio::test]
async fn authenticate_distinguishes_expired_and_invalid_tokens() -> TestResult {
    let config = AuthConfig {
        access_token_ttl_seconds: 0,
        ..AuthConfig::default()
    };
    let ctx = TestContext::new(config).await?;
    let registered = ctx
        .authenticator()
        .register(registration("alice@example.com", "Secret123"))
        .await?;

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let err = ctx
        .authenticator()
        .authenticate(&registered.tokens.access_token)
        .await
        .expect_err("expired token");
    assert!(matches!(err, AuthError::TokenExpired));

    let err = ctx
        .authenticator()
        .authenticate("garbage")
        .await
        .expect_err("garbage token");
    assert!(matches!(err, AuthError::InvalidToken));

    Ok(())
}

#[tokio::test]
async fn change_password_requires_current_password() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let registered = ctx
        .authenticator()
        .register(registration("alice@example.com", "Secret123"))
        .await?;
    let user_id = registered.user.id;

    let err = ctx
        .authenticator()
        .change_password(user_id, "Wrong1234", "NewSecret123")
        .await
        .expect_err("wrong current password");
    assert!(matches!(err, AuthError::IncorrectPassword));

    let err = ctx
        .authenticator()
        .change_password(user_id, "Secret123", "weak")
        .await
        .expect_err("weak new password");
    assert!(matches!(err, AuthError::Validation(_)));

    ctx.authenticator()
        .change_password(user_id, "Secret123", "NewSecret123")
        .await?;

    ctx.authenticator()
        .login("alice@example.com", "NewSecret123")
        .await?;
    let err = ctx
        .authenticator()
        .login("alice@example.com", "Secret123")
        .await
        .expect_err("old password");
    assert!(matches!(err, AuthError::InvalidCredentials));

    Ok(())
}

#[tokio::test]
async fn update_profile_changes_only_given_fields() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let registered = ctx
        .authenticator()
        .register(registration("alice@example.com", "Secret123"))
        .await?;

    let updated = ctx
        .authenticator()
        .update_profile(
            registered.user.id,
            UpdateProfileRequest {
                first_name: Some("Alicia".into()),
                last_name: None,
                avatar: Some("https://cdn.example.com/a.png".into()),
            },
        )
        .await?;
    assert_eq!(updated.first_name, "Alicia");
    assert_eq!(updated.last_name, "Smith");
    assert_eq!(updated.avatar.as_deref(), Some("https://cdn.example.com/a.png"));

    let err = ctx
        .authenticator()
        .update_profile(
            registered.user.id,
            UpdateProfileRequest {
                first_name: Some("x".repeat(51)),
                ..Default::default()
            },
        )
        .await
        .expect_err("name too long");
    assert!(matches!(err, AuthError::Validation(_)));

    let profile = ctx.authenticator().profile(registered.user.id).await?;
    assert_eq!(profile.first_name, "Alicia");

    Ok(())
}
