//! PaginationService - backward-cursor history pages for a user pair.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::messaging::{Cursor, MessagingError, Page, PartnerRef, Take};
use crate::ports::{MessageQuery, MessageStore, UserDirectory};

pub struct PaginationService {
    store: Arc<dyn MessageStore>,
    directory: Arc<dyn UserDirectory>,
}

impl PaginationService {
    pub fn new(store: Arc<dyn MessageStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { store, directory }
    }

    /// Returns up to `take` messages between `viewer` and `partner`, newest
    /// first, strictly older than `cursor` when one is given.
    ///
    /// # Errors
    ///
    /// - `NotFound` if either participant cannot be resolved
    /// - `StoreUnavailable` if the store call fails
    pub async fn get_page(
        &self,
        viewer: UserId,
        partner: &PartnerRef,
        cursor: Option<Cursor>,
        take: Take,
    ) -> Result<Page, MessagingError> {
        let viewer = self.directory.resolve(&PartnerRef::Id(viewer)).await?;
        let partner = self.directory.resolve(partner).await?;

        let query = MessageQuery::between(viewer.id, partner.id)
            .before(cursor)
            .limit(take);
        let messages = self.store.find_messages(&query).await?;

        tracing::debug!(
            viewer = %viewer.id,
            partner = %partner.id,
            returned = messages.len(),
            "Served history page"
        );

        Ok(Page::from_messages(messages))
    }
}
