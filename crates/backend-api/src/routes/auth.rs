use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde::Deserialize;
use supportdesk_auth::{
    validate_email, validate_name, validate_password, AuthResponse, AuthTokens, Registration,
    MIN_PASSWORD_LENGTH,
};
use supportdesk_database::{UpdateProfileRequest, User};
use utoipa::ToSchema;

use crate::util::{non_empty, ApiResponse, ApiResult, JsonBody, Validator};
use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

fn check(validator: &mut Validator, field: &str, result: Result<(), String>) {
    if let Err(message) = result {
        validator.push(field, message);
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and signed in"),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse),
        (status = 429, description = "Too many authentication attempts", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ApiError> {
    let mut validator = Validator::default();
    check(&mut validator, "email", validate_email(&payload.email));
    check(&mut validator, "password", validate_password(&payload.password));
    check(&mut validator, "firstName", validate_name("First name", &payload.first_name));
    check(&mut validator, "lastName", validate_name("Last name", &payload.last_name));
    validator.finish()?;

    let response = state
        .authenticator()
        .register(Registration {
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(response, "Registration successful"),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in"),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid credentials or deactivated account", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let mut validator = Validator::default();
    check(&mut validator, "email", validate_email(&payload.email));
    validator.check(!payload.password.is_empty(), "password", "Password is required");
    validator.finish()?;

    let response = state
        .authenticator()
        .login(&payload.email, &payload.password)
        .await?;
    Ok(ApiResponse::with_message(response, "Login successful"))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "Auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair"),
        (status = 401, description = "Invalid refresh token", body = crate::error::ErrorResponse)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> ApiResult<AuthTokens> {
    let mut validator = Validator::default();
    validator.required(
        "refreshToken",
        payload.refresh_token.as_deref(),
        "Refresh token is required",
    );
    validator.finish()?;

    let token = payload.refresh_token.unwrap_or_default();
    let tokens = state.authenticator().refresh(token.trim()).await?;
    Ok(ApiResponse::with_message(tokens, "Token refreshed successfully"))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Refresh token revoked"),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<()> {
    let user = state.authenticate(&headers).await?;
    state.authenticator().logout(user.id).await?;
    Ok(ApiResponse::message("Logged out successfully"))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current user"),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<User> {
    let user = state.authenticate(&headers).await?;
    let profile = state.authenticator().profile(user.id).await?;
    Ok(ApiResponse::ok(profile))
}

#[utoipa::path(
    put,
    path = "/api/auth/profile",
    tag = "Auth",
    security(("bearerAuth" = [])),
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated"),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<ProfileUpdateRequest>,
) -> ApiResult<User> {
    let user = state.authenticate(&headers).await?;

    let mut validator = Validator::default();
    if let Some(first_name) = payload.first_name.as_deref() {
        check(&mut validator, "firstName", validate_name("First name", first_name));
    }
    if let Some(last_name) = payload.last_name.as_deref() {
        check(&mut validator, "lastName", validate_name("Last name", last_name));
    }
    validator.finish()?;

    let updated = state
        .authenticator()
        .update_profile(
            user.id,
            UpdateProfileRequest {
                first_name: payload.first_name,
                last_name: payload.last_name,
                avatar: payload.avatar,
            },
        )
        .await?;
    Ok(ApiResponse::with_message(updated, "Profile updated successfully"))
}

#[utoipa::path(
    put,
    path = "/api/auth/password",
    tag = "Auth",
    security(("bearerAuth" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Validation failed or wrong current password", body = crate::error::ErrorResponse),
        (status = 401, description = "Authentication required", body = crate::error::ErrorResponse)
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> ApiResult<()> {
    let user = state.authenticate(&headers).await?;

    let mut validator = Validator::default();
    validator.check(
        non_empty(Some(payload.current_password.as_str())).is_some(),
        "currentPassword",
        "Current password is required",
    );
    if let Err(message) = validate_password(&payload.new_password) {
        let message = if payload.new_password.chars().count() < MIN_PASSWORD_LENGTH {
            format!("New password must be at least {MIN_PASSWORD_LENGTH} characters")
        } else {
            message
        };
        validator.push("newPassword", message);
    }
    validator.finish()?;

    state
        .authenticator()
        .change_password(user.id, &payload.current_password, &payload.new_password)
        .await?;
    Ok(ApiResponse::message("Password changed successfully"))
}
