use serde::Deserialize;
use supportdesk_database::{
    AdminUserUpdate, PageRequest, User, UserFilter, UserRole, UserStats, UserSummary,
};
use tracing::info;
use utoipa::ToSchema;

use super::error::ServiceError;
use crate::error::FieldError;
use crate::AppState;

pub const DEFAULT_SEARCH_LIMIT: i64 = 10;
const MAX_NAME_CHARS: usize = 50;

/// Admin edit of an account. `role` stays a string so an unknown value is a
/// field error rather than a body rejection.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
}

impl UserUpdate {
    pub fn into_admin_update(self) -> Result<AdminUserUpdate, Vec<FieldError>> {
        let mut errors = Vec::new();
        for (field, label, value) in [
            ("firstName", "First name", &self.first_name),
            ("lastName", "Last name", &self.last_name),
        ] {
            if value
                .as_deref()
                .is_some_and(|value| value.trim().chars().count() > MAX_NAME_CHARS)
            {
                errors.push(FieldError::new(
                    field,
                    format!("{label} cannot exceed {MAX_NAME_CHARS} characters"),
                ));
            }
        }

        let role = match self.role.as_deref().map(str::parse::<UserRole>) {
            None => None,
            Some(Ok(role)) => Some(role),
            Some(Err(_)) => {
                errors.push(FieldError::new("role", "Invalid role specified"));
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(AdminUserUpdate {
            first_name: self.first_name,
            last_name: self.last_name,
            role,
            is_active: self.is_active,
            is_verified: self.is_verified,
        })
    }
}

pub async fn list(
    state: &AppState,
    filter: &UserFilter,
    page: PageRequest,
) -> Result<(Vec<User>, i64), ServiceError> {
    Ok(state.users().list(filter, page).await?)
}

pub async fn get(state: &AppState, user_id: &str) -> Result<User, ServiceError> {
    state
        .users()
        .find_by_public_id(user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("User not found"))
}

pub async fn update(
    state: &AppState,
    user_id: &str,
    update: UserUpdate,
    admin: &User,
) -> Result<User, ServiceError> {
    let update = update.into_admin_update().map_err(ServiceError::Validation)?;
    let user = get(state, user_id).await?;
    let updated = state.users().admin_update(user.id, &update).await?;
    info!(user_id = %user_id, admin_id = %admin.public_id, "user updated by admin");
    Ok(updated)
}

/// Deactivate an account. Super admins cannot be removed.
pub async fn delete(state: &AppState, user_id: &str, admin: &User) -> Result<(), ServiceError> {
    let user = get(state, user_id).await?;
    if user.role == UserRole::SuperAdmin {
        return Err(ServiceError::forbidden("Cannot delete super admin"));
    }

    state.users().deactivate(user.id).await?;
    info!(user_id = %user_id, admin_id = %admin.public_id, "user deactivated by admin");
    Ok(())
}

pub async fn stats(state: &AppState) -> Result<UserStats, ServiceError> {
    Ok(state.users().stats().await?)
}

pub async fn search(
    state: &AppState,
    term: &str,
    limit: Option<i64>,
) -> Result<Vec<UserSummary>, ServiceError> {
    if term.trim().is_empty() {
        return Err(ServiceError::bad_request("Search query is required"));
    }
    let limit = limit.filter(|limit| *limit > 0).unwrap_or(DEFAULT_SEARCH_LIMIT);
    Ok(state.users().search(term, limit).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_roles_are_field_errors() {
        let update = UserUpdate {
            role: Some("owner".to_string()),
            ..UserUpdate::default()
        };
        let errors = update.into_admin_update().unwrap_err();
        assert_eq!(errors, vec![FieldError::new("role", "Invalid role specified")]);
    }

    #[test]
    fn valid_update_maps_every_field() {
        let update = UserUpdate {
            first_name: Some("Ada".to_string()),
            role: Some("super_admin".to_string()),
            is_active: Some(false),
            ..UserUpdate::default()
        };
        let admin_update = update.into_admin_update().unwrap();
        assert_eq!(admin_update.role, Some(UserRole::SuperAdmin));
        assert_eq!(admin_update.is_active, Some(false));
        assert_eq!(admin_update.first_name.as_deref(), Some("Ada"));
        assert!(admin_update.last_name.is_none());
    }

    #[test]
    fn long_names_are_rejected() {
        let update = UserUpdate {
            last_name: Some("x".repeat(51)),
            ..UserUpdate::default()
        };
        let errors = update.into_admin_update().unwrap_err();
        assert_eq!(errors[0].field, "lastName");
    }
}
