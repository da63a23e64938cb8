//! Session validation port.
//!
//! Resolves a session token into the user it belongs to. Session issuance
//! lives outside this service; only the lookup contract is defined here.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

/// Validates session tokens and extracts user identity.
///
/// # Contract
///
/// - `AuthError::InvalidToken` for empty or malformed tokens
/// - `AuthError::UserNotFound` when the token no longer maps to a user
/// - `AuthError::ServiceUnavailable` for transient errors
#[async_trait]
pub trait SessionValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn SessionValidator) {}
}
