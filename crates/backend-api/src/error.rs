use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::{header::RETRY_AFTER, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use supportdesk_auth::AuthError;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::services::ServiceError;

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Vec<FieldError>>,
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
            retry_after: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn validation(details: Vec<FieldError>) -> Self {
        Self {
            details: Some(details),
            ..Self::bad_request("Validation failed")
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    pub fn too_many_requests(message: impl Into<String>, retry_after_seconds: u64) -> Self {
        Self {
            retry_after: Some(retry_after_seconds),
            ..Self::new(StatusCode::TOO_MANY_REQUESTS, message)
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            success: false,
            error: ErrorBody {
                message: self.message,
                details: self.details,
            },
        });
        let mut response = (self.status, body).into_response();
        if let Some(seconds) = self.retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::UserExists => Self::conflict(error.to_string()),
            AuthError::InvalidCredentials
            | AuthError::AccountDeactivated
            | AuthError::InvalidRefreshToken => Self::unauthorized(error.to_string()),
            AuthError::TokenExpired => Self::unauthorized("Token expired. Please login again."),
            AuthError::InvalidToken => Self::unauthorized("Invalid token."),
            AuthError::UserNotFound => Self::not_found("User not found"),
            AuthError::IncorrectPassword | AuthError::Validation(_) => {
                Self::bad_request(error.to_string())
            }
            AuthError::Database(_) | AuthError::PasswordHash(_) | AuthError::TokenSigning(_) => {
                error!(error = ?error, "auth error");
                Self::internal_server_error("Internal server error")
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::NotFound(message) => Self::not_found(message),
            ServiceError::Forbidden(message) => Self::forbidden(message),
            ServiceError::BadRequest(message) => Self::bad_request(message),
            ServiceError::Validation(details) => Self::validation(details),
            ServiceError::Conflict(message) => Self::conflict(message),
            ServiceError::PayloadTooLarge(message) => Self::payload_too_large(message),
            ServiceError::Auth(auth) => Self::from(auth),
            ServiceError::Database(message) => {
                error!(error = %message, "database error");
                Self::internal_server_error("Database operation failed")
            }
            ServiceError::Io(err) => {
                error!(error = ?err, "file system error");
                Self::internal_server_error("File operation failed")
            }
            ServiceError::Internal(message) => {
                error!(error = %message, "internal error");
                Self::internal_server_error(message)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected json body");
        Self::bad_request("Invalid JSON payload")
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::payload_too_large("File size exceeds limit");
        }
        warn!(error = %error.body_text(), "rejected multipart body");
        Self::bad_request("Invalid multipart payload")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn validation_error_renders_details() {
        let response =
            ApiError::validation(vec![FieldError::new("message", "Message is required")])
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["message"], "Validation failed");
        assert_eq!(json["error"]["details"][0]["field"], "message");
    }

    #[tokio::test]
    async fn rate_limit_error_sets_retry_after() {
        let response = ApiError::too_many_requests("slow down", 42).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "42");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn auth_errors_map_to_semantic_status_codes() {
        assert_eq!(ApiError::from(AuthError::UserExists).status, StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(AuthError::InvalidCredentials).status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::TokenExpired).message,
            "Token expired. Please login again."
        );
        assert_eq!(
            ApiError::from(AuthError::IncorrectPassword).status,
            StatusCode::BAD_REQUEST
        );
        let internal = ApiError::from(AuthError::Database("locked".into()));
        assert_eq!(internal.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!internal.message.contains("locked"));
    }
}
