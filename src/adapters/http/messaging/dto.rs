//! Request and response types for the messaging endpoints.
//!
//! Messages, pages and summaries serialize directly from the domain types
//! (camelCase). Only inputs and envelopes live here.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;
use crate::domain::messaging::{ConversationSummary, Cursor, MessagingError, Take};

/// POST /api/messages
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SendMessageRequest {
    /// Recipient email or user id.
    pub recipient: String,
    pub content: String,
}

/// GET /api/conversations/:partner/messages
///
/// Kept as strings so malformed values become a `VALIDATION_FAILED` body
/// instead of a bare extractor rejection.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PageQuery {
    /// RFC 3339 `createdAt` of the oldest message already shown.
    pub cursor: Option<String>,
    pub take: Option<String>,
}

impl PageQuery {
    pub fn cursor(&self) -> Result<Option<Cursor>, MessagingError> {
        self.cursor
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|raw| {
                chrono::DateTime::parse_from_rfc3339(raw)
                    .map(|dt| Timestamp::from_datetime(dt.with_timezone(&chrono::Utc)))
                    .map_err(|e| MessagingError::validation("cursor", e.to_string()))
            })
            .transpose()
    }

    /// Missing means the default; numbers are clamped into `[1, 50]`.
    pub fn take(&self) -> Result<Take, MessagingError> {
        let raw = self
            .take
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.trim()
                    .parse::<i64>()
                    .map_err(|_| MessagingError::validation("take", "must be an integer"))
            })
            .transpose()?;
        Ok(Take::clamped(raw))
    }
}

/// GET /api/conversations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummary>,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}
