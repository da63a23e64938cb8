//! User directory port - resolves participant identities.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::domain::messaging::{PartnerRef, User};

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError>;

    /// Lookup by normalized (lowercase) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Resolves a partner reference.
    ///
    /// # Errors
    ///
    /// `UserNotFound` when no user matches.
    async fn resolve(&self, partner: &PartnerRef) -> Result<User, DomainError> {
        let found = match partner {
            PartnerRef::Id(id) => self.find_by_id(*id).await?,
            PartnerRef::Email(email) => self.find_by_email(email).await?,
        };
        found.ok_or_else(|| {
            DomainError::new(ErrorCode::UserNotFound, "User not found")
                .with_detail("user", partner.to_string())
        })
    }
}
