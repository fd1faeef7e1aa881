use axum::extract::FromRequest;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum::Json;
use serde::Serialize;
use supportdesk_database::PageRequest;
use utoipa::ToSchema;

use crate::error::FieldError;
use crate::ApiError;

pub const MAX_PAGE_LIMIT: i64 = 100;

pub fn require_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let missing = || ApiError::unauthorized("Access denied. No token provided.");
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(missing)?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(missing());
    }

    let token = parts.next().unwrap_or("");
    if token.is_empty() {
        return Err(missing());
    }

    Ok(token.to_string())
}

/// `axum::Json` with rejections rendered as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data: Some(data),
        })
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            pages: (total + request.limit - 1) / request.limit,
        }
    }
}

/// Parse `page` and `limit` query values. Absent values default to 1 and 20.
pub fn parse_page(page: Option<&str>, limit: Option<&str>) -> Result<PageRequest, ApiError> {
    let defaults = PageRequest::default();
    let mut validator = Validator::default();

    let page = match page.map(str::trim).filter(|value| !value.is_empty()) {
        None => defaults.page,
        Some(raw) => match raw.parse::<i64>() {
            Ok(value) if value >= 1 => value,
            _ => {
                validator.push("page", "Page must be a positive integer");
                defaults.page
            }
        },
    };

    let limit = match limit.map(str::trim).filter(|value| !value.is_empty()) {
        None => defaults.limit,
        Some(raw) => match raw.parse::<i64>() {
            Ok(value) if (1..=MAX_PAGE_LIMIT).contains(&value) => value,
            _ => {
                validator.push("limit", "Limit must be between 1 and 100");
                defaults.limit
            }
        },
    };

    validator.finish()?;
    Ok(PageRequest::new(page, limit))
}

/// Lenient boolean used by query strings and multipart fields.
pub fn parse_bool(value: Option<&str>) -> Option<bool> {
    match value?.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Split a comma separated tag list, dropping blanks.
pub fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Treat empty strings as absent.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Collects field errors and reports them together as a 400.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn check(&mut self, valid: bool, field: &str, message: &str) {
        if !valid {
            self.push(field, message);
        }
    }

    /// Present and not blank after trimming.
    pub fn required(&mut self, field: &str, value: Option<&str>, message: &str) {
        self.check(non_empty(value).is_some(), field, message);
    }

    pub fn max_chars(&mut self, field: &str, value: Option<&str>, max: usize, message: &str) {
        if let Some(value) = value {
            self.check(value.trim().chars().count() <= max, field, message);
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    #[test]
    fn require_bearer_extracts_token_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer TOKEN123"));

        let token = require_bearer(&headers).expect("token should be extracted");
        assert_eq!(token, "TOKEN123");
    }

    #[test]
    fn require_bearer_rejects_missing_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer"));

        let error = require_bearer(&headers).expect_err("should reject missing token");
        assert_eq!(error.status, StatusCode::UNAUTHORIZED);
        assert_eq!(error.message, "Access denied. No token provided.");
    }

    #[test]
    fn parse_page_defaults_and_bounds() {
        assert_eq!(parse_page(None, None).unwrap(), PageRequest::new(1, 20));
        assert_eq!(parse_page(Some("3"), Some("100")).unwrap(), PageRequest::new(3, 100));

        let error = parse_page(Some("0"), Some("101")).unwrap_err();
        let details = error.details.unwrap();
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].message, "Page must be a positive integer");
        assert_eq!(details[1].message, "Limit must be between 1 and 100");

        assert!(parse_page(Some("abc"), None).is_err());
    }

    #[test]
    fn pagination_rounds_pages_up() {
        let pagination = Pagination::new(PageRequest::new(1, 20), 41);
        assert_eq!(pagination.pages, 3);
        assert_eq!(Pagination::new(PageRequest::default(), 0).pages, 0);
    }

    #[test]
    fn split_tags_trims_and_drops_blanks() {
        assert_eq!(split_tags(" billing, ,faq ,"), vec!["billing", "faq"]);
    }
}
