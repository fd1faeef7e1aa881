//! User repository for database operations.

use std::collections::BTreeMap;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::entities::{
    AdminUserUpdate, CreateUserRequest, UpdateProfileRequest, User, UserCredentials, UserFilter,
    UserRole, UserStats, UserSummary,
};
use crate::search::like_pattern;
use crate::time::{days_ago, now_timestamp, start_of_month, start_of_today};
use crate::types::{DailyCount, PageRequest, UserError, UserResult};

const USER_COLUMNS: &str = "id, public_id, email, first_name, last_name, role, avatar, is_active, \
                            is_verified, last_login_at, created_at, updated_at";

/// Repository for user database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> UserResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> UserResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Look up the stored password hash for a login attempt.
    pub async fn find_credentials_by_email(&self, email: &str) -> UserResult<Option<UserCredentials>> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, public_id, password_hash, refresh_token, is_active FROM users WHERE email = ?",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;
        Ok(credentials)
    }

    pub async fn find_credentials_by_id(&self, id: i64) -> UserResult<Option<UserCredentials>> {
        let credentials = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, public_id, password_hash, refresh_token, is_active FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(credentials)
    }

    /// Create new user. Duplicate emails map to [`UserError::EmailAlreadyExists`].
    pub async fn create(&self, request: &CreateUserRequest) -> UserResult<User> {
        let now = now_timestamp();
        let public_id = cuid2::cuid();

        let result = sqlx::query(
            "INSERT INTO users (public_id, email, password_hash, first_name, last_name, role, is_active, is_verified, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.email.trim().to_lowercase())
        .bind(&request.password_hash)
        .bind(request.first_name.trim())
        .bind(request.last_name.trim())
        .bind(request.role)
        .bind(request.is_verified)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let user_id = result.last_insert_rowid();
        info!(user_id = %public_id, role = %request.role, "created user");

        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| UserError::DatabaseError("failed to retrieve created user".to_string()))
    }

    pub async fn update_profile(&self, id: i64, request: &UpdateProfileRequest) -> UserResult<User> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE users SET updated_at = ");
        builder.push_bind(now_timestamp());
        if let Some(first_name) = &request.first_name {
            builder.push(", first_name = ").push_bind(first_name.trim().to_string());
        }
        if let Some(last_name) = &request.last_name {
            builder.push(", last_name = ").push_bind(last_name.trim().to_string());
        }
        if let Some(avatar) = &request.avatar {
            builder.push(", avatar = ").push_bind(avatar.clone());
        }
        builder.push(" WHERE id = ").push_bind(id);

        self.apply_update(id, builder).await
    }

    pub async fn admin_update(&self, id: i64, request: &AdminUserUpdate) -> UserResult<User> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE users SET updated_at = ");
        builder.push_bind(now_timestamp());
        if let Some(first_name) = &request.first_name {
            builder.push(", first_name = ").push_bind(first_name.trim().to_string());
        }
        if let Some(last_name) = &request.last_name {
            builder.push(", last_name = ").push_bind(last_name.trim().to_string());
        }
        if let Some(role) = request.role {
            builder.push(", role = ").push_bind(role);
        }
        if let Some(is_active) = request.is_active {
            builder.push(", is_active = ").push_bind(is_active);
        }
        if let Some(is_verified) = request.is_verified {
            builder.push(", is_verified = ").push_bind(is_verified);
        }
        builder.push(" WHERE id = ").push_bind(id);

        self.apply_update(id, builder).await
    }

    async fn apply_update(&self, id: i64, mut builder: QueryBuilder<'_, Sqlite>) -> UserResult<User> {
        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound);
        }
        self.find_by_id(id).await?.ok_or(UserError::UserNotFound)
    }

    /// Store (or clear, with `None`) the active refresh token.
    pub async fn set_refresh_token(&self, id: i64, token: Option<&str>) -> UserResult<()> {
        sqlx::query("UPDATE users SET refresh_token = ?, updated_at = ? WHERE id = ?")
            .bind(token)
            .bind(now_timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Replace the password hash and invalidate any outstanding refresh token.
    pub async fn set_password_hash(&self, id: i64, password_hash: &str) -> UserResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, refresh_token = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(password_hash)
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound);
        }
        Ok(())
    }

    pub async fn touch_last_login(&self, id: i64) -> UserResult<()> {
        let now = now_timestamp();
        sqlx::query("UPDATE users SET last_login_at = ?, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Soft delete: the account is kept but can no longer sign in.
    pub async fn deactivate(&self, id: i64) -> UserResult<()> {
        let result = sqlx::query(
            "UPDATE users SET is_active = 0, refresh_token = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound);
        }
        info!(user_id = id, "deactivated user");
        Ok(())
    }

    fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a UserFilter) {
        builder.push(" WHERE 1 = 1");
        if let Some(role) = filter.role {
            builder.push(" AND role = ").push_bind(role);
        }
        if let Some(is_active) = filter.is_active {
            builder.push(" AND is_active = ").push_bind(is_active);
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            builder
                .push(" AND (email LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR first_name LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR last_name LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
    }

    /// Paginated listing, newest accounts first.
    pub async fn list(&self, filter: &UserFilter, page: PageRequest) -> UserResult<(Vec<User>, i64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
        Self::push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        Self::push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());
        let users = select.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    /// Match active users by email or name.
    pub async fn search(&self, term: &str, limit: i64) -> UserResult<Vec<UserSummary>> {
        let pattern = like_pattern(term.trim());
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT public_id, email, first_name, last_name, role FROM users
             WHERE is_active = 1
               AND (email LIKE ?1 ESCAPE '\\' OR first_name LIKE ?1 ESCAPE '\\' OR last_name LIKE ?1 ESCAPE '\\')
             ORDER BY first_name, last_name
             LIMIT ?2",
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn count(&self) -> UserResult<i64> {
        let total = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn stats(&self) -> UserResult<UserStats> {
        let (total_users, active_users): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM users",
        )
        .fetch_one(&self.pool)
        .await?;

        let active_users_today: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE is_active = 1 AND last_login_at >= ?",
        )
        .bind(start_of_today())
        .fetch_one(&self.pool)
        .await?;

        let by_role: Vec<(String, i64)> =
            sqlx::query_as("SELECT role, COUNT(*) FROM users GROUP BY role")
                .fetch_all(&self.pool)
                .await?;
        let users_by_role: BTreeMap<String, i64> = by_role.into_iter().collect();

        let new_users_this_month: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE created_at >= ?")
                .bind(start_of_month())
                .fetch_one(&self.pool)
                .await?;

        let users_by_day = sqlx::query_as::<_, DailyCount>(
            "SELECT substr(created_at, 1, 10) AS date, COUNT(*) AS count FROM users
             WHERE created_at >= ? GROUP BY date ORDER BY date",
        )
        .bind(days_ago(30))
        .fetch_all(&self.pool)
        .await?;

        Ok(UserStats {
            total_users,
            active_users,
            active_users_today,
            users_by_role,
            new_users_this_month,
            users_by_day,
        })
    }

    /// True when at least one account holds `role`.
    pub async fn role_exists(&self, role: UserRole) -> UserResult<bool> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role = ?)")
            .bind(role)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists == 1)
    }
}
