//! Server access used by the client reconciler.
//!
//! `HttpConversationApi` talks to a running server over the REST surface;
//! `InProcessConversationApi` calls the application services directly and
//! backs in-process deployments and tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};

use crate::adapters::http::messaging::ErrorResponse;
use crate::application::{NotificationService, PaginationService};
use crate::domain::foundation::{MessageId, UserId};
use crate::domain::messaging::{Cursor, Message, MessagingError, Page, PartnerRef, Take};

/// The two server operations a conversation view needs.
#[async_trait]
pub trait ConversationApi: Send + Sync {
    /// Messages with `partner`, newest first, strictly older than `cursor`.
    async fn get_page(
        &self,
        partner: &PartnerRef,
        cursor: Option<Cursor>,
        take: Take,
    ) -> Result<Page, MessagingError>;

    /// Marks a message addressed to the caller as read.
    async fn mark_as_read(&self, message_id: MessageId) -> Result<Message, MessagingError>;
}

// ════════════════════════════════════════════════════════════════════════════════
// HTTP
// ════════════════════════════════════════════════════════════════════════════════

/// REST client authenticated with a session token.
#[derive(Clone)]
pub struct HttpConversationApi {
    client: Client,
    base_url: Url,
    session_token: String,
}

impl HttpConversationApi {
    pub fn new(
        base_url: impl Into<String>,
        session_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MessagingError> {
        let base_url = Url::parse(base_url.into().trim_end_matches('/'))
            .map_err(|e| MessagingError::validation("base_url", e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(MessagingError::validation("base_url", "not a base URL"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MessagingError::store_unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            session_token: session_token.into(),
        })
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn transport_error(e: reqwest::Error) -> MessagingError {
        if e.is_timeout() {
            MessagingError::store_unavailable("Request timed out")
        } else if e.is_connect() {
            MessagingError::store_unavailable(format!("Connection failed: {}", e))
        } else {
            MessagingError::store_unavailable(e.to_string())
        }
    }

    /// Turns non-2xx responses into the matching error variant.
    async fn check_status(response: Response) -> Result<Response, MessagingError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);

        Err(status_to_error(status, detail))
    }
}

/// Inverse of the server's status mapping.
fn status_to_error(status: StatusCode, detail: String) -> MessagingError {
    match status {
        StatusCode::NOT_FOUND => MessagingError::NotFound(detail),
        StatusCode::FORBIDDEN => MessagingError::Forbidden,
        StatusCode::UNAUTHORIZED => MessagingError::Unauthorized,
        StatusCode::BAD_REQUEST => MessagingError::validation("request", detail),
        _ => MessagingError::store_unavailable(format!("Server error {}: {}", status, detail)),
    }
}

#[async_trait]
impl ConversationApi for HttpConversationApi {
    async fn get_page(
        &self,
        partner: &PartnerRef,
        cursor: Option<Cursor>,
        take: Take,
    ) -> Result<Page, MessagingError> {
        let mut query = vec![("take", take.get().to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_rfc3339()));
        }

        let response = self
            .client
            .get(self.url(&["api", "conversations", &partner.to_string(), "messages"]))
            .bearer_auth(&self.session_token)
            .query(&query)
            .send()
            .await
            .map_err(Self::transport_error)?;

        Self::check_status(response)
            .await?
            .json::<Page>()
            .await
            .map_err(|e| MessagingError::store_unavailable(format!("Bad page body: {}", e)))
    }

    async fn mark_as_read(&self, message_id: MessageId) -> Result<Message, MessagingError> {
        let response = self
            .client
            .post(self.url(&["api", "messages", &message_id.to_string(), "read"]))
            .bearer_auth(&self.session_token)
            .send()
            .await
            .map_err(Self::transport_error)?;

        Self::check_status(response)
            .await?
            .json::<Message>()
            .await
            .map_err(|e| MessagingError::store_unavailable(format!("Bad message body: {}", e)))
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// In-process
// ════════════════════════════════════════════════════════════════════════════════

/// Calls the application services as `viewer`.
pub struct InProcessConversationApi {
    viewer: UserId,
    pagination: PaginationService,
    notifications: Arc<NotificationService>,
}

impl InProcessConversationApi {
    pub fn new(
        viewer: UserId,
        pagination: PaginationService,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            viewer,
            pagination,
            notifications,
        }
    }
}

#[async_trait]
impl ConversationApi for InProcessConversationApi {
    async fn get_page(
        &self,
        partner: &PartnerRef,
        cursor: Option<Cursor>,
        take: Take,
    ) -> Result<Page, MessagingError> {
        self.pagination
            .get_page(self.viewer, partner, cursor, take)
            .await
    }

    async fn mark_as_read(&self, message_id: MessageId) -> Result<Message, MessagingError> {
        self.notifications.mark_as_read(message_id, self.viewer).await
    }
}
