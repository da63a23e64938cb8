//! ListConversationsHandler - per-partner summaries for the conversation list.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::messaging::{ConversationSummary, MessagingError};
use crate::ports::MessageStore;

pub struct ListConversationsHandler {
    store: Arc<dyn MessageStore>,
}

impl ListConversationsHandler {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, viewer: UserId) -> Result<Vec<ConversationSummary>, MessagingError> {
        Ok(self.store.find_conversation_summaries(viewer).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::InMemoryMessageStore;
    use crate::domain::foundation::Timestamp;
    use crate::domain::messaging::MessageContent;

    #[tokio::test]
    async fn summaries_show_latest_message_and_unread_count_per_partner() {
        let store = InMemoryMessageStore::new();
        let me = store.add_user("me@example.com").await.unwrap();
        let ann = store.add_user("ann@example.com").await.unwrap();
        let ben = store.add_user("ben@example.com").await.unwrap();
        let text = |s: &str| MessageContent::new(s).unwrap();

        let first = store.insert_message(ann.id, me.id, text("a1")).await.unwrap();
        store.insert_message(ann.id, me.id, text("a2")).await.unwrap();
        store.insert_message(me.id, ben.id, text("b1")).await.unwrap();
        let latest_ann = store.insert_message(me.id, ann.id, text("a3")).await.unwrap();
        store
            .update_message_read_at(first.id(), Timestamp::now())
            .await
            .unwrap();

        let summaries = ListConversationsHandler::new(Arc::new(store.clone()))
            .handle(me.id)
            .await
            .unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].partner_email, "ann@example.com");
        assert_eq!(summaries[0].last_message.id(), latest_ann.id());
        assert_eq!(summaries[0].unread_count, 1);
        assert_eq!(summaries[1].partner_email, "ben@example.com");
        assert_eq!(summaries[1].unread_count, 0);
    }

    #[tokio::test]
    async fn store_failure_is_store_unavailable() {
        let store = InMemoryMessageStore::new();
        store.set_unavailable(true);
        let err = ListConversationsHandler::new(Arc::new(store))
            .handle(UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MessagingError::StoreUnavailable(_)));
    }
}
