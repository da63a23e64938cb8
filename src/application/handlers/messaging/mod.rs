//! Messaging handlers and services.

mod list_conversations;
mod notification_service;
mod pagination_service;
mod send_message;

pub use list_conversations::ListConversationsHandler;
pub use notification_service::NotificationService;
pub use pagination_service::PaginationService;
pub use send_message::{SendMessageCommand, SendMessageHandler};
