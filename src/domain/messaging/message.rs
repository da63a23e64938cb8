//! The direct message entity.
//!
//! A message is immutable except for `read_at`, which moves from `None` to
//! `Some` exactly once and only on behalf of the recipient.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MessageId, Timestamp, UserId, ValidationError};

/// Upper bound on message length, in characters.
pub const MAX_CONTENT_CHARS: usize = 4000;

/// Trimmed, non-empty message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("content"));
        }
        if trimmed.chars().count() > MAX_CONTENT_CHARS {
            return Err(ValidationError::too_long("content", MAX_CONTENT_CHARS));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MessageContent> for String {
    fn from(content: MessageContent) -> Self {
        content.0
    }
}

/// A message between two distinct users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    id: MessageId,
    sender_id: UserId,
    recipient_id: UserId,
    content: MessageContent,
    created_at: Timestamp,
    read_at: Option<Timestamp>,
}

impl Message {
    /// Creates a new unread message.
    ///
    /// # Errors
    ///
    /// `InvalidFormat` when sender and recipient are the same user.
    pub fn new(
        id: MessageId,
        sender_id: UserId,
        recipient_id: UserId,
        content: MessageContent,
        created_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        if sender_id == recipient_id {
            return Err(ValidationError::invalid_format(
                "recipient",
                "cannot send a message to yourself",
            ));
        }
        Ok(Self {
            id,
            sender_id,
            recipient_id,
            content,
            created_at,
            read_at: None,
        })
    }

    /// Rebuilds a message from persisted fields.
    pub fn reconstitute(
        id: MessageId,
        sender_id: UserId,
        recipient_id: UserId,
        content: MessageContent,
        created_at: Timestamp,
        read_at: Option<Timestamp>,
    ) -> Self {
        Self {
            id,
            sender_id,
            recipient_id,
            content,
            created_at,
            read_at,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn sender_id(&self) -> UserId {
        self.sender_id
    }

    pub fn recipient_id(&self) -> UserId {
        self.recipient_id
    }

    pub fn content(&self) -> &str {
        self.content.as_str()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn read_at(&self) -> Option<Timestamp> {
        self.read_at
    }

    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// Both participants, sender first.
    pub fn participants(&self) -> [UserId; 2] {
        [self.sender_id, self.recipient_id]
    }

    pub fn involves(&self, user: &UserId) -> bool {
        self.sender_id == *user || self.recipient_id == *user
    }

    /// True when the message belongs to the conversation between `a` and `b`.
    pub fn is_between(&self, a: &UserId, b: &UserId) -> bool {
        (self.sender_id == *a && self.recipient_id == *b)
            || (self.sender_id == *b && self.recipient_id == *a)
    }

    /// The other participant from `viewer`'s perspective.
    pub fn partner_of(&self, viewer: &UserId) -> UserId {
        if self.sender_id == *viewer {
            self.recipient_id
        } else {
            self.sender_id
        }
    }

    /// Unread and addressed to `viewer`.
    pub fn is_unread_for(&self, viewer: &UserId) -> bool {
        self.recipient_id == *viewer && self.read_at.is_none()
    }

    /// Records the first read. Returns false when already read; the stored
    /// timestamp never changes after the first call.
    pub fn mark_read(&mut self, at: Timestamp) -> bool {
        if self.read_at.is_some() {
            return false;
        }
        self.read_at = Some(at);
        true
    }

    /// Drops a locally assumed read mark after the server rejected it.
    pub(crate) fn revert_read(&mut self) {
        self.read_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unread() -> Message {
        Message::new(
            MessageId::new(),
            UserId::new(),
            UserId::new(),
            MessageContent::new("hi").unwrap(),
            Timestamp::now(),
        )
        .unwrap()
    }

    #[test]
    fn content_is_trimmed() {
        let content = MessageContent::new("  hello there \n").unwrap();
        assert_eq!(content.as_str(), "hello there");
    }

    #[test]
    fn content_rejects_whitespace_only() {
        assert_eq!(
            MessageContent::new("   \t "),
            Err(ValidationError::empty_field("content"))
        );
    }

    #[test]
    fn content_rejects_oversized_text() {
        let long = "x".repeat(MAX_CONTENT_CHARS + 1);
        assert!(matches!(
            MessageContent::new(long),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn content_deserialization_validates() {
        assert!(serde_json::from_str::<MessageContent>("\"  \"").is_err());
        let ok: MessageContent = serde_json::from_str("\" yo \"").unwrap();
        assert_eq!(ok.as_str(), "yo");
    }

    #[test]
    fn message_to_self_is_rejected() {
        let me = UserId::new();
        let result = Message::new(
            MessageId::new(),
            me,
            me,
            MessageContent::new("hi").unwrap(),
            Timestamp::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn mark_read_is_set_once() {
        let mut message = unread();
        let first = Timestamp::now();

        assert!(message.mark_read(first));
        assert!(!message.mark_read(first.plus_millis(500)));
        assert_eq!(message.read_at(), Some(first));
    }

    #[test]
    fn is_between_accepts_either_direction() {
        let message = unread();
        let (a, b) = (message.sender_id(), message.recipient_id());

        assert!(message.is_between(&a, &b));
        assert!(message.is_between(&b, &a));
        assert!(!message.is_between(&a, &UserId::new()));
    }

    #[test]
    fn partner_of_returns_other_side() {
        let message = unread();
        assert_eq!(message.partner_of(&message.sender_id()), message.recipient_id());
        assert_eq!(message.partner_of(&message.recipient_id()), message.sender_id());
    }

    #[test]
    fn unread_only_counts_for_recipient() {
        let message = unread();
        assert!(message.is_unread_for(&message.recipient_id()));
        assert!(!message.is_unread_for(&message.sender_id()));
    }
}
