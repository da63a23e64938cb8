//! Application layer - command and query handlers.
//!
//! Orchestrates domain operations over the ports. Writes go through
//! `SendMessageHandler` and `NotificationService`; reads through
//! `PaginationService` and `ListConversationsHandler`.

pub mod handlers;

pub use handlers::messaging::{
    ListConversationsHandler, NotificationService, PaginationService, SendMessageCommand,
    SendMessageHandler,
};
