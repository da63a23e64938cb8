//! PostgreSQL implementation of MessageStore.
//!
//! `created_at` is assigned by the database and is strictly increasing within
//! a conversation: inserts for one pair serialize on a transaction-scoped
//! advisory lock and take `max(created_at) + 1µs` when the clock has not
//! moved past it. The exclusive `created_at < cursor` filter therefore never
//! splits a tie across a page boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, MessageId, Timestamp, UserId};
use crate::domain::messaging::{ConversationSummary, Message, MessageContent};
use crate::ports::{MessageQuery, MessageStore};

/// Raw `messages` row.
type MessageRow = (Uuid, Uuid, Uuid, String, DateTime<Utc>, Option<DateTime<Utc>>);

/// Summary row: the latest message, then partner id, partner email, unread count.
type SummaryRow = (
    Uuid,
    Uuid,
    Uuid,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Uuid,
    String,
    i64,
);

const MESSAGE_COLUMNS: &str = "id, sender_id, recipient_id, content, created_at, read_at";

/// Matches both directions of the conversation between `$1` and `$2` in the
/// shape of `idx_messages_pair_created`.
const PAIR_FILTER: &str = "LEAST(sender_id, recipient_id) = LEAST($1::uuid, $2::uuid) \
     AND GREATEST(sender_id, recipient_id) = GREATEST($1::uuid, $2::uuid)";

/// Advisory lock key shared by both directions of a conversation.
fn pair_lock_key(a: UserId, b: UserId) -> String {
    let (low, high) = if a.as_uuid() <= b.as_uuid() { (a, b) } else { (b, a) };
    format!("messages:{}:{}", low, high)
}

pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn message_from_row(row: MessageRow) -> Result<Message, DomainError> {
    let (id, sender_id, recipient_id, content, created_at, read_at) = row;
    let content = MessageContent::new(content).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Stored message {} has invalid content: {}", id, e),
        )
    })?;
    Ok(Message::reconstitute(
        MessageId::from_uuid(id),
        UserId::from_uuid(sender_id),
        UserId::from_uuid(recipient_id),
        content,
        Timestamp::from_datetime(created_at),
        read_at.map(Timestamp::from_datetime),
    ))
}

fn summary_from_row(row: SummaryRow) -> Result<ConversationSummary, DomainError> {
    let (id, sender_id, recipient_id, content, created_at, read_at, partner_id, email, unread) =
        row;
    let last_message = message_from_row((id, sender_id, recipient_id, content, created_at, read_at))?;
    Ok(ConversationSummary {
        partner_id: UserId::from_uuid(partner_id),
        partner_email: email,
        last_message,
        unread_count: u32::try_from(unread).unwrap_or(u32::MAX),
    })
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn insert_message(
        &self,
        sender_id: UserId,
        recipient_id: UserId,
        content: MessageContent,
    ) -> Result<Message, DomainError> {
        if sender_id == recipient_id {
            return Err(DomainError::validation(
                "recipient",
                "cannot send a message to yourself",
            ));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(pair_lock_key(sender_id, recipient_id))
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database("Failed to lock conversation", e))?;

        let row: MessageRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO messages (id, sender_id, recipient_id, content, created_at)
            VALUES ($3, $1, $2, $4, GREATEST(
                clock_timestamp(),
                (SELECT max(created_at) + interval '1 microsecond'
                   FROM messages
                  WHERE {PAIR_FILTER})
            ))
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(sender_id.as_uuid())
        .bind(recipient_id.as_uuid())
        .bind(Uuid::new_v4())
        .bind(content.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to insert message", e))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit message", e))?;

        message_from_row(row)
    }

    async fn find_message(&self, id: MessageId) -> Result<Option<Message>, DomainError> {
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch message", e))?;

        row.map(message_from_row).transpose()
    }

    async fn update_message_read_at(
        &self,
        id: MessageId,
        at: Timestamp,
    ) -> Result<Message, DomainError> {
        // COALESCE keeps the first read timestamp under concurrent calls.
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            r#"
            UPDATE messages
            SET read_at = COALESCE(read_at, $2)
            WHERE id = $1
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to mark message read", e))?;

        match row {
            Some(row) => message_from_row(row),
            None => Err(DomainError::new(ErrorCode::MessageNotFound, "Message not found")
                .with_detail("message_id", id.to_string())),
        }
    }

    async fn find_messages(&self, query: &MessageQuery) -> Result<Vec<Message>, DomainError> {
        let (a, b) = query.participants;
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE {PAIR_FILTER}
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#
        ))
        .bind(a.as_uuid())
        .bind(b.as_uuid())
        .bind(query.before.map(|c| *c.as_datetime()))
        .bind(i64::from(query.limit.get()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch messages", e))?;

        rows.into_iter().map(message_from_row).collect()
    }

    async fn find_conversation_summaries(
        &self,
        viewer: UserId,
    ) -> Result<Vec<ConversationSummary>, DomainError> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            WITH conversation AS (
                SELECT m.*,
                       CASE WHEN m.sender_id = $1 THEN m.recipient_id ELSE m.sender_id END
                           AS partner_id
                FROM messages m
                WHERE m.sender_id = $1 OR m.recipient_id = $1
            ),
            latest AS (
                SELECT DISTINCT ON (partner_id) *
                FROM conversation
                ORDER BY partner_id, created_at DESC, id DESC
            )
            SELECT l.id, l.sender_id, l.recipient_id, l.content, l.created_at, l.read_at,
                   l.partner_id, u.email,
                   (SELECT COUNT(*)
                      FROM messages unread
                     WHERE unread.recipient_id = $1
                       AND unread.sender_id = l.partner_id
                       AND unread.read_at IS NULL) AS unread_count
            FROM latest l
            JOIN users u ON u.id = l.partner_id
            ORDER BY l.created_at DESC, l.id DESC
            "#,
        )
        .bind(viewer.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list conversations", e))?;

        rows.into_iter().map(summary_from_row).collect()
    }
}
