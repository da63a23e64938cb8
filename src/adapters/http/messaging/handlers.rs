//! HTTP handlers for messaging endpoints.
//!
//! These handlers connect axum routes to the application services.

use std::sync::Arc;

use axum::extract::{FromRef, Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::adapters::websocket::LiveState;
use crate::application::{
    ListConversationsHandler, NotificationService, PaginationService, SendMessageCommand,
    SendMessageHandler,
};
use crate::domain::foundation::{MessageId, ValidationError};
use crate::domain::messaging::{MessagingError, PartnerRef};
use crate::ports::{EventBus, EventPublisher, EventSubscriber, MessageStore, UserDirectory};

use super::super::middleware::RequireAuth;
use super::dto::{ConversationListResponse, ErrorResponse, PageQuery, SendMessageRequest};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state; cloned per request, every dependency is an `Arc`.
#[derive(Clone)]
pub struct MessagingAppState {
    pub store: Arc<dyn MessageStore>,
    pub directory: Arc<dyn UserDirectory>,
    pub publisher: Arc<dyn EventPublisher>,
    pub subscriber: Arc<dyn EventSubscriber>,
    pub live_queue_capacity: usize,
}

impl MessagingAppState {
    /// Wires both bus roles to the same bus instance.
    pub fn new<B>(
        store: Arc<dyn MessageStore>,
        directory: Arc<dyn UserDirectory>,
        bus: Arc<B>,
        live_queue_capacity: usize,
    ) -> Self
    where
        B: EventBus + 'static,
    {
        Self {
            store,
            directory,
            publisher: bus.clone(),
            subscriber: bus,
            live_queue_capacity,
        }
    }

    pub fn notification_service(&self) -> Arc<NotificationService> {
        Arc::new(NotificationService::new(
            self.store.clone(),
            self.publisher.clone(),
        ))
    }

    pub fn pagination_service(&self) -> PaginationService {
        PaginationService::new(self.store.clone(), self.directory.clone())
    }

    pub fn send_message_handler(&self) -> SendMessageHandler {
        SendMessageHandler::new(
            self.store.clone(),
            self.directory.clone(),
            self.notification_service(),
        )
    }

    pub fn list_conversations_handler(&self) -> ListConversationsHandler {
        ListConversationsHandler::new(self.store.clone())
    }
}

impl FromRef<MessagingAppState> for LiveState {
    fn from_ref(state: &MessagingAppState) -> Self {
        LiveState::new(state.subscriber.clone(), state.live_queue_capacity)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/messages - Send a message
pub async fn send_message(
    State(state): State<MessagingAppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, MessagingApiError> {
    let cmd = SendMessageCommand {
        sender_id: user.id,
        recipient: PartnerRef::parse(&request.recipient)?,
        content: request.content,
    };

    let message = state.send_message_handler().handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /api/messages/:id/read - Mark a received message as read
pub async fn mark_as_read(
    State(state): State<MessagingAppState>,
    RequireAuth(user): RequireAuth,
    Path(message_id): Path<String>,
) -> Result<impl IntoResponse, MessagingApiError> {
    let message_id: MessageId = message_id
        .parse()
        .map_err(|_| MessagingError::validation("id", "must be a message id"))?;

    let message = state
        .notification_service()
        .mark_as_read(message_id, user.id)
        .await?;

    Ok(Json(message))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/conversations - Per-partner summaries
pub async fn list_conversations(
    State(state): State<MessagingAppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse, MessagingApiError> {
    let conversations = state.list_conversations_handler().handle(user.id).await?;
    Ok(Json(ConversationListResponse { conversations }))
}

/// GET /api/conversations/:partner/messages - One page of history
pub async fn get_messages(
    State(state): State<MessagingAppState>,
    RequireAuth(user): RequireAuth,
    Path(partner): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, MessagingApiError> {
    let partner = PartnerRef::parse(&partner)?;
    let page = state
        .pagination_service()
        .get_page(user.id, &partner, query.cursor()?, query.take()?)
        .await?;

    Ok(Json(page))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error wrapper that converts to HTTP responses.
#[derive(Debug)]
pub struct MessagingApiError(pub MessagingError);

impl From<MessagingError> for MessagingApiError {
    fn from(err: MessagingError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for MessagingApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl MessagingApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MessagingError::NotFound(_) => StatusCode::NOT_FOUND,
            MessagingError::Forbidden => StatusCode::FORBIDDEN,
            MessagingError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            MessagingError::Unauthorized => StatusCode::UNAUTHORIZED,
            MessagingError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            MessagingError::ChannelError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match &self.0 {
            MessagingError::NotFound(_) => "NOT_FOUND",
            MessagingError::Forbidden => "FORBIDDEN",
            MessagingError::ValidationFailed { .. } => "VALIDATION_FAILED",
            MessagingError::Unauthorized => "UNAUTHORIZED",
            MessagingError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            MessagingError::ChannelError(_) => "CHANNEL_ERROR",
        }
    }
}

impl IntoResponse for MessagingApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.0 {
            MessagingError::StoreUnavailable(detail) => {
                tracing::error!("Store unavailable: {}", detail);
                ErrorResponse::new(self.error_code(), "Message store unavailable")
            }
            other => ErrorResponse::new(self.error_code(), other.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
