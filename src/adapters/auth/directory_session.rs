//! Session validator backed by the user directory.
//!
//! The session token is the user's email, as set in the `session` cookie by
//! the sign-in flow. Issuing sessions is outside this service.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::domain::messaging::normalize_email;
use crate::ports::{SessionValidator, UserDirectory};

pub struct DirectorySessionValidator {
    directory: Arc<dyn UserDirectory>,
}

impl DirectorySessionValidator {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl SessionValidator for DirectorySessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let email = normalize_email(token).map_err(|_| AuthError::InvalidToken)?;

        let user = self
            .directory
            .find_by_email(&email)
            .await
            .map_err(|e| AuthError::service_unavailable(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;

        Ok(AuthenticatedUser::new(user.id, user.email))
    }
}
