//! HTTP adapters - REST API and the WebSocket upgrade endpoint.

pub mod messaging;
pub mod middleware;
pub mod router;

pub use messaging::{messaging_routes, MessagingApiError, MessagingAppState};
pub use router::{app_router, cors_layer, health};
