//! Authentication types for the domain layer.
//!
//! These types represent an authenticated user resolved from a session token.
//! Any session scheme can populate them via the `SessionValidator` port.

use super::UserId;
use thiserror::Error;

/// Authenticated user attached to a request or socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// The unique user identifier.
    pub id: UserId,

    /// User's email address; conversations are addressed by it.
    pub email: String,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The token is missing or malformed.
    #[error("Invalid session token")]
    InvalidToken,

    /// Token is well formed but no longer maps to a user.
    #[error("User not found")]
    UserNotFound,

    /// The backing store could not be reached.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if the client should log in again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, AuthError::InvalidToken | AuthError::UserNotFound)
    }
}
