//! In-Memory Message Store Adapter
//!
//! Holds users and messages in memory. Used for development runs without a
//! database and throughout the test suite.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, MessageId, Timestamp, UserId};
use crate::domain::messaging::{
    newest_first, normalize_email, summarize_conversations, ConversationSummary, Message,
    MessageContent, User,
};
use crate::ports::{MessageQuery, MessageStore, UserDirectory};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    messages: Vec<Message>,
    by_id: HashMap<MessageId, usize>,
    last_created_at: Option<Timestamp>,
}

impl State {
    /// Store clock: never hands out the same `created_at` twice.
    fn next_created_at(&mut self) -> Timestamp {
        let now = Timestamp::now();
        let at = match self.last_created_at {
            Some(last) if !now.is_after(&last) => last.plus_micros(1),
            _ => now,
        };
        self.last_created_at = Some(at);
        at
    }
}

/// In-memory implementation of `MessageStore` and `UserDirectory`.
#[derive(Clone, Default)]
pub struct InMemoryMessageStore {
    state: Arc<RwLock<State>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user, returning the existing one if the email is taken.
    pub async fn add_user(&self, email: &str) -> Result<User, DomainError> {
        let email = normalize_email(email)?;
        let mut state = self.state.write().await;
        if let Some(existing) = state.users.values().find(|u| u.email == email) {
            return Ok(existing.clone());
        }
        let user = User::new(UserId::new(), &email)?;
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Makes every subsequent call fail with `DatabaseError` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn message_count(&self) -> usize {
        self.state.read().await.messages.len()
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "In-memory store marked unavailable",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert_message(
        &self,
        sender_id: UserId,
        recipient_id: UserId,
        content: MessageContent,
    ) -> Result<Message, DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let created_at = state.next_created_at();
        let message = Message::new(MessageId::new(), sender_id, recipient_id, content, created_at)?;

        let index = state.messages.len();
        state.by_id.insert(message.id(), index);
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn find_message(&self, id: MessageId) -> Result<Option<Message>, DomainError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.by_id.get(&id).map(|&i| state.messages[i].clone()))
    }

    async fn update_message_read_at(
        &self,
        id: MessageId,
        at: Timestamp,
    ) -> Result<Message, DomainError> {
        self.check_available()?;
        let mut state = self.state.write().await;
        let index = *state.by_id.get(&id).ok_or_else(|| {
            DomainError::new(ErrorCode::MessageNotFound, "Message not found")
                .with_detail("message_id", id.to_string())
        })?;
        let message = &mut state.messages[index];
        message.mark_read(at);
        Ok(message.clone())
    }

    async fn find_messages(&self, query: &MessageQuery) -> Result<Vec<Message>, DomainError> {
        self.check_available()?;
        let state = self.state.read().await;
        let mut matching: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| query.matches(m))
            .cloned()
            .collect();
        matching.sort_by(newest_first);
        matching.truncate(query.limit.as_usize());
        Ok(matching)
    }

    async fn find_conversation_summaries(
        &self,
        viewer: UserId,
    ) -> Result<Vec<ConversationSummary>, DomainError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(summarize_conversations(&viewer, &state.messages, |id| {
            state.users.get(id).map(|u| u.email.clone())
        }))
    }
}

#[async_trait]
impl UserDirectory for InMemoryMessageStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        self.check_available()?;
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.check_available()?;
        let email = email.trim().to_lowercase();
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}
