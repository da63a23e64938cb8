//! SendMessageHandler - stores a message, then announces it on the bus.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::messaging::{Message, MessageContent, MessagingError, PartnerRef};
use crate::ports::{MessageStore, UserDirectory};

use super::NotificationService;

/// Command to send a direct message.
#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub sender_id: UserId,
    pub recipient: PartnerRef,
    pub content: String,
}

pub struct SendMessageHandler {
    store: Arc<dyn MessageStore>,
    directory: Arc<dyn UserDirectory>,
    notifications: Arc<NotificationService>,
}

impl SendMessageHandler {
    pub fn new(
        store: Arc<dyn MessageStore>,
        directory: Arc<dyn UserDirectory>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            store,
            directory,
            notifications,
        }
    }

    /// # Errors
    ///
    /// - `ValidationFailed` for blank or oversized content, or a self-addressed message
    /// - `NotFound` if the recipient is unknown
    /// - `StoreUnavailable` if the store call fails; nothing is published then
    pub async fn handle(&self, cmd: SendMessageCommand) -> Result<Message, MessagingError> {
        let content = MessageContent::new(&cmd.content)?;
        let recipient = self.directory.resolve(&cmd.recipient).await?;

        if recipient.id == cmd.sender_id {
            return Err(MessagingError::validation(
                "recipient",
                "cannot send a message to yourself",
            ));
        }

        let message = self
            .store
            .insert_message(cmd.sender_id, recipient.id, content)
            .await?;

        tracing::info!(
            message_id = %message.id(),
            sender = %message.sender_id(),
            recipient = %message.recipient_id(),
            "Message stored"
        );

        self.notifications.publish_message_added(&message).await;

        Ok(message)
    }
}
