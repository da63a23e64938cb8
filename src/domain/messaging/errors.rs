//! Messaging error taxonomy surfaced to callers.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors returned by the messaging services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagingError {
    /// Referenced user or message does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller lacks rights over the target message.
    #[error("Permission denied")]
    Forbidden,

    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    #[error("Authentication required")]
    Unauthorized,

    /// Push transport failure. Recoverable by refetching.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Durable store call failed. Not retried here.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl MessagingError {
    pub fn not_found(what: impl Into<String>) -> Self {
        MessagingError::NotFound(what.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MessagingError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn channel(message: impl Into<String>) -> Self {
        MessagingError::ChannelError(message.into())
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        MessagingError::StoreUnavailable(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            MessagingError::NotFound(_) => ErrorCode::MessageNotFound,
            MessagingError::Forbidden => ErrorCode::Forbidden,
            MessagingError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            MessagingError::Unauthorized => ErrorCode::Unauthorized,
            MessagingError::ChannelError(_) => ErrorCode::ChannelError,
            MessagingError::StoreUnavailable(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<DomainError> for MessagingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            code if code.is_not_found() => MessagingError::NotFound(err.message),
            code if code.is_validation() => MessagingError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::Forbidden => MessagingError::Forbidden,
            ErrorCode::Unauthorized => MessagingError::Unauthorized,
            ErrorCode::ChannelError => MessagingError::ChannelError(err.message),
            _ => MessagingError::StoreUnavailable(err.to_string()),
        }
    }
}

impl From<ValidationError> for MessagingError {
    fn from(err: ValidationError) -> Self {
        MessagingError::ValidationFailed {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}
