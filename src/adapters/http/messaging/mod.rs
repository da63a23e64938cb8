//! HTTP adapter for messaging endpoints.
//!
//! - `POST /api/messages` - Send a message
//! - `POST /api/messages/:id/read` - Mark a message read
//! - `GET /api/conversations` - Conversation summaries
//! - `GET /api/conversations/:partner/messages` - Cursor-paginated history
//! - `GET /api/live` - WebSocket push channel

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{ConversationListResponse, ErrorResponse, PageQuery, SendMessageRequest};
pub use handlers::{MessagingApiError, MessagingAppState};
pub use routes::messaging_routes;
