//! Client side of message sync.
//!
//! - `ConversationApi` - server access (HTTP or in-process)
//! - `MessageList` - deduplicated, newest-first local view
//! - `ConversationReconciler` - merges pages and pushed events, drives read marks

pub mod api;
pub mod message_list;
pub mod reconciler;

pub use api::{ConversationApi, HttpConversationApi, InProcessConversationApi};
pub use message_list::MessageList;
pub use reconciler::{ChannelSignal, ConversationReconciler, MarkReport};
