use supportdesk_auth::AuthError;
use supportdesk_database::{ChatError, DocumentError, FaqError, UserError};
use thiserror::Error;

use crate::error::FieldError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("database error: {0}")]
    Database(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<UserError> for ServiceError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::UserNotFound => Self::not_found("User not found"),
            UserError::EmailAlreadyExists => {
                Self::Conflict("User already exists with this email".to_string())
            }
            UserError::DatabaseError(message) => Self::Database(message),
        }
    }
}

impl From<ChatError> for ServiceError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::ChatNotFound => Self::not_found("Chat not found"),
            ChatError::MessageNotFound => Self::not_found("Message not found"),
            ChatError::DatabaseError(message) | ChatError::SerializationError(message) => {
                Self::Database(message)
            }
        }
    }
}

impl From<DocumentError> for ServiceError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::DocumentNotFound => Self::not_found("Document not found"),
            DocumentError::DatabaseError(message) | DocumentError::SerializationError(message) => {
                Self::Database(message)
            }
        }
    }
}

impl From<FaqError> for ServiceError {
    fn from(err: FaqError) -> Self {
        match err {
            FaqError::FaqNotFound => Self::not_found("FAQ not found"),
            FaqError::DatabaseError(message) | FaqError::SerializationError(message) => {
                Self::Database(message)
            }
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}
