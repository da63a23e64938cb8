//! WebSocket message protocol for the live channel.
//!
//! - Server → Client: connection ack, new messages, read receipts, errors, pongs
//! - Client → Server: pings

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MessageId, Timestamp, UserId};
use crate::domain::messaging::{Message, MessagingError};

use super::live_channel::LiveEvent;

// ============================================
// Server → Client Messages
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected(ConnectedMessage),

    #[serde(rename = "message.added")]
    MessageAdded(MessageAddedMessage),

    #[serde(rename = "message.read")]
    MessageRead(MessageReadMessage),

    /// `CHANNEL_ERROR` tells the client to refetch.
    Error(ErrorMessage),

    Pong(PongMessage),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedMessage {
    pub user_id: UserId,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAddedMessage {
    pub message: Message,
    pub participant_ids: [UserId; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReadMessage {
    pub message_id: MessageId,
    pub read_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PongMessage {
    pub timestamp: String,
}

impl ServerMessage {
    pub fn connected(user_id: UserId) -> Self {
        ServerMessage::Connected(ConnectedMessage {
            user_id,
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }

    pub fn pong() -> Self {
        ServerMessage::Pong(PongMessage {
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }

    pub fn error(err: &MessagingError) -> Self {
        ServerMessage::Error(ErrorMessage {
            code: err.code().to_string(),
            message: err.to_string(),
            timestamp: Timestamp::now().to_rfc3339(),
        })
    }
}

impl From<LiveEvent> for ServerMessage {
    fn from(event: LiveEvent) -> Self {
        match event {
            LiveEvent::MessageAdded(added) => ServerMessage::MessageAdded(MessageAddedMessage {
                message: added.message,
                participant_ids: added.participant_ids,
            }),
            LiveEvent::MessageRead(read) => ServerMessage::MessageRead(MessageReadMessage {
                message_id: read.message_id,
                read_at: read.read_at,
            }),
        }
    }
}

// ============================================
// Client → Server Messages
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::messaging::{MessageAdded, MessageContent, MessageRead};
    use serde_json::Value;

    #[test]
    fn message_added_is_tagged() {
        let message = Message::new(
            MessageId::new(),
            UserId::new(),
            UserId::new(),
            MessageContent::new("hi").unwrap(),
            Timestamp::now(),
        )
        .unwrap();
        let msg: ServerMessage = LiveEvent::MessageAdded(MessageAdded::new(message)).into();

        let json: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "message.added");
        assert_eq!(json["participantIds"].as_array().unwrap().len(), 2);
        assert_eq!(json["message"]["content"], "hi");
    }

    #[test]
    fn message_read_round_trips_through_json() {
        let msg: ServerMessage = LiveEvent::MessageRead(MessageRead {
            message_id: MessageId::new(),
            read_at: Timestamp::now(),
        })
        .into();

        let text = serde_json::to_string(&msg).unwrap();
        assert!(text.contains(r#""type":"message.read""#));
        assert_eq!(serde_json::from_str::<ServerMessage>(&text).unwrap(), msg);
    }

    #[test]
    fn channel_error_uses_error_code() {
        let msg = ServerMessage::error(&MessagingError::channel("lagged"));
        let json: Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "CHANNEL_ERROR");
    }

    #[test]
    fn ping_parses() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping);
    }
}
