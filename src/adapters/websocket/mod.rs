//! WebSocket adapters for live message push.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 Event Bus                    │
//! │        message-added    message-read         │
//! └──────────────────────────────────────────────┘
//!                      │ one pair of forwarders per connection
//!                      ▼
//! ┌──────────────────────────────────────────────┐
//! │          LiveSubscriptionChannel             │
//! │  filters message-added by participant        │
//! │  bounded queue, lag → CHANNEL_ERROR          │
//! └──────────────────────────────────────────────┘
//!                      │
//!                      ▼
//!             WebSocket  GET /api/live
//! ```
//!
//! - [`live_channel`] - per-connection subscription and queue
//! - [`messages`] - wire protocol
//! - [`handler`] - axum upgrade handler

pub mod handler;
pub mod live_channel;
pub mod messages;

pub use handler::{live_handler, websocket_router, LiveState};
pub use live_channel::{LiveEvent, LiveSubscriptionChannel, QueueForwarder};
pub use messages::{
    ClientMessage, ConnectedMessage, ErrorMessage, MessageAddedMessage, MessageReadMessage,
    PongMessage, ServerMessage,
};
