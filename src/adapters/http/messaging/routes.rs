//! Axum router configuration for messaging endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::adapters::websocket::websocket_router;

use super::handlers::{
    get_messages, list_conversations, mark_as_read, send_message, MessagingAppState,
};

/// Create the messaging API router.
///
/// # Routes
/// - `POST /messages` - Send a message
/// - `POST /messages/:id/read` - Mark a received message as read
/// - `GET /conversations` - Conversation summaries for the caller
/// - `GET /conversations/:partner/messages` - Page backwards through history
/// - `GET /live` - WebSocket upgrade for pushed events
pub fn messaging_routes() -> Router<MessagingAppState> {
    Router::new()
        .route("/messages", post(send_message))
        .route("/messages/:id/read", post(mark_as_read))
        .route("/conversations", get(list_conversations))
        .route("/conversations/:partner/messages", get(get_messages))
        .merge(websocket_router())
}
