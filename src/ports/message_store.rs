//! Message store port - durable, ordered record of direct messages.
//!
//! The store assigns `id` and `created_at` at insert time and owns the
//! atomicity of the single-row `read_at` update.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, MessageId, Timestamp, UserId};
use crate::domain::messaging::{ConversationSummary, Cursor, Message, MessageContent, Take};

/// Filter for a history read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageQuery {
    /// The unordered participant pair.
    pub participants: (UserId, UserId),
    /// Exclusive upper bound on `created_at`.
    pub before: Option<Cursor>,
    pub limit: Take,
}

impl MessageQuery {
    pub fn between(a: UserId, b: UserId) -> Self {
        Self {
            participants: (a, b),
            before: None,
            limit: Take::default(),
        }
    }

    pub fn before(mut self, cursor: Option<Cursor>) -> Self {
        self.before = cursor;
        self
    }

    pub fn limit(mut self, take: Take) -> Self {
        self.limit = take;
        self
    }

    /// True when `message` passes the participant and cursor filters.
    pub fn matches(&self, message: &Message) -> bool {
        let (a, b) = self.participants;
        message.is_between(&a, &b)
            && self
                .before
                .map_or(true, |cursor| message.created_at().is_before(&cursor))
    }
}

/// Port for message persistence.
///
/// Implementations must ensure:
/// - `created_at` is assigned by the store
/// - `update_message_read_at` only writes when `read_at` is still unset
/// - `find_messages` orders by `created_at` descending, ties by id descending
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Stores a new unread message.
    async fn insert_message(
        &self,
        sender_id: UserId,
        recipient_id: UserId,
        content: MessageContent,
    ) -> Result<Message, DomainError>;

    /// Point lookup.
    async fn find_message(&self, id: MessageId) -> Result<Option<Message>, DomainError>;

    /// Sets `read_at` if unset and returns the stored message.
    ///
    /// A message that was already read comes back unchanged.
    ///
    /// # Errors
    ///
    /// - `MessageNotFound` if the message does not exist
    /// - `DatabaseError` on persistence failure
    async fn update_message_read_at(
        &self,
        id: MessageId,
        at: Timestamp,
    ) -> Result<Message, DomainError>;

    /// History read, newest first, bounded by `query.limit`.
    async fn find_messages(&self, query: &MessageQuery) -> Result<Vec<Message>, DomainError>;

    /// One summary per partner of `viewer`, newest conversation first.
    async fn find_conversation_summaries(
        &self,
        viewer: UserId,
    ) -> Result<Vec<ConversationSummary>, DomainError>;
}
