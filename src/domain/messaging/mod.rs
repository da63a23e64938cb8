//! Messaging module - direct messages between two users.
//!
//! - `Message` - the only entity; immutable except for the first read mark
//! - `Page` / `Take` / `Cursor` - backward-cursor history pages
//! - `ConversationSummary` - per-partner listing, recomputed on fetch
//! - `MessageAdded` / `MessageRead` - events published on the bus

mod errors;
mod events;
mod message;
mod page;
mod summary;
mod user;

pub use errors::MessagingError;
pub use events::{MessageAdded, MessageRead, MESSAGE_ADDED, MESSAGE_READ};
pub use message::{Message, MessageContent, MAX_CONTENT_CHARS};
pub use page::{newest_first, Cursor, Page, Take};
pub use summary::{summarize_conversations, ConversationSummary};
pub use user::{normalize_email, PartnerRef, User};
