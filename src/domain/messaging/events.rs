//! Messaging domain events and their bus topics.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainEvent, MessageId, Timestamp, UserId};

use super::Message;

/// Topic for newly stored messages.
pub const MESSAGE_ADDED: &str = "message-added";

/// Topic for first-time read marks.
pub const MESSAGE_READ: &str = "message-read";

/// Published after a message is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAdded {
    pub message: Message,
    pub participant_ids: [UserId; 2],
}

impl MessageAdded {
    pub fn new(message: Message) -> Self {
        let participant_ids = message.participants();
        Self {
            message,
            participant_ids,
        }
    }

    pub fn is_visible_to(&self, viewer: &UserId) -> bool {
        self.participant_ids.contains(viewer)
    }
}

impl DomainEvent for MessageAdded {
    fn event_type(&self) -> &'static str {
        MESSAGE_ADDED
    }

    fn aggregate_id(&self) -> String {
        self.message.id().to_string()
    }

    fn occurred_at(&self) -> Timestamp {
        self.message.created_at()
    }
}

/// Published when a recipient reads a message for the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRead {
    pub message_id: MessageId,
    pub read_at: Timestamp,
}

impl DomainEvent for MessageRead {
    fn event_type(&self) -> &'static str {
        MESSAGE_READ
    }

    fn aggregate_id(&self) -> String {
        self.message_id.to_string()
    }

    fn occurred_at(&self) -> Timestamp {
        self.read_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::EventEnvelope;
    use crate::domain::messaging::MessageContent;

    #[test]
    fn message_added_carries_both_participants() {
        let (a, b) = (UserId::new(), UserId::new());
        let message = Message::new(
            MessageId::new(),
            a,
            b,
            MessageContent::new("hi").unwrap(),
            Timestamp::now(),
        )
        .unwrap();

        let event = MessageAdded::new(message);

        assert!(event.is_visible_to(&a));
        assert!(event.is_visible_to(&b));
        assert!(!event.is_visible_to(&UserId::new()));
    }

    #[test]
    fn message_read_round_trips_through_envelope() {
        let event = MessageRead {
            message_id: MessageId::new(),
            read_at: Timestamp::now(),
        };

        let envelope = EventEnvelope::from_event(&event).unwrap();

        assert_eq!(envelope.event_type, MESSAGE_READ);
        assert_eq!(envelope.payload_as::<MessageRead>().unwrap(), event);
    }
}
