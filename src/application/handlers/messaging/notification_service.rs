//! NotificationService - turns store writes into bus publications.
//!
//! Publishing is fire-and-forget: the bus contains handler failures, and an
//! event that cannot be serialized is logged and dropped. Clients recover
//! missed events by refetching.

use std::sync::Arc;

use crate::domain::foundation::{DomainEvent, EventEnvelope, MessageId, Timestamp, UserId};
use crate::domain::messaging::{Message, MessageAdded, MessageRead, MessagingError};
use crate::ports::{EventPublisher, MessageStore};

pub struct NotificationService {
    store: Arc<dyn MessageStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn MessageStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Publishes `message-added`. Participants are the message's sender and recipient.
    pub async fn publish_message_added(&self, message: &Message) {
        let event = MessageAdded::new(message.clone());
        self.publish(&event, message.sender_id()).await;
    }

    /// Publishes `message-read`.
    pub async fn publish_message_read(
        &self,
        message_id: MessageId,
        read_at: Timestamp,
        reader: UserId,
    ) {
        let event = MessageRead {
            message_id,
            read_at,
        };
        self.publish(&event, reader).await;
    }

    /// Marks a message read on behalf of its recipient.
    ///
    /// Repeated calls return the stored message with the first `read_at` and
    /// publish nothing.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the message does not exist
    /// - `Forbidden` if `requester` is not the recipient
    /// - `StoreUnavailable` if the store call fails
    pub async fn mark_as_read(
        &self,
        message_id: MessageId,
        requester: UserId,
    ) -> Result<Message, MessagingError> {
        let message = self
            .store
            .find_message(message_id)
            .await?
            .ok_or_else(|| MessagingError::not_found(format!("message {}", message_id)))?;

        if message.recipient_id() != requester {
            tracing::debug!(
                message_id = %message_id,
                requester = %requester,
                "Rejected read mark from non-recipient"
            );
            return Err(MessagingError::Forbidden);
        }

        if message.is_read() {
            return Ok(message);
        }

        let now = Timestamp::now();
        let updated = self.store.update_message_read_at(message_id, now).await?;

        // A concurrent caller may have won the conditional update.
        if updated.read_at() == Some(now) {
            self.publish_message_read(message_id, now, requester).await;
        }

        Ok(updated)
    }

    async fn publish<E>(&self, event: &E, actor: UserId)
    where
        E: DomainEvent + serde::Serialize,
    {
        match EventEnvelope::from_event(event) {
            Ok(envelope) => {
                self.publisher
                    .publish(envelope.with_user_id(actor.to_string()))
                    .await
            }
            Err(e) => tracing::error!(
                event_type = event.event_type(),
                aggregate_id = %event.aggregate_id(),
                "Dropping unpublishable event: {}",
                e
            ),
        }
    }
}
